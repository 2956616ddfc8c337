// Copyright 2026 the Swatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Swatch layout: mapping named sprite attributes onto texture channels.
//!
//! Every sprite owns one *swatch*: a run of `texels_per_swatch` texels in a
//! shared data texture, each texel holding `data_channel_count` floats. The
//! [`AttributeMapper`] decides which float in the swatch holds which
//! attribute component, and how swatches are laid out in rows:
//!
//! ```text
//!   row 0: [swatch 0][swatch 1] … [swatch swatches_per_row-1]
//!   row 1: [swatch swatches_per_row] …
//! ```
//!
//! Value channels come first in declaration order. After all of them, each
//! interpolable attribute gets one `…Delta` channel per component that holds
//! its rate of change, so transitions can blend with the right velocity.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::ConfigurationError;

/// Suffix appended to the channel name of an interpolable component to name
/// its rate-of-change channel.
pub const DELTA_SUFFIX: &str = "Delta";

/// Name of the channel that holds a sprite's transition time (and, once the
/// callback has run, its arrival time in elapsed milliseconds).
pub const TRANSITION_TIME_MS: &str = "TransitionTimeMs";

/// Declaration of one sprite attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpriteAttribute {
    /// Attribute name, e.g. `"PositionWorld"`.
    pub name: &'static str,
    /// Component suffixes, e.g. `["X", "Y"]`. Empty for a scalar attribute.
    pub components: &'static [&'static str],
    /// Whether the value animates between previous and target.
    pub interpolable: bool,
    /// Whether a single value may be broadcast to every component.
    pub broadcastable: bool,
}

impl SpriteAttribute {
    /// A non-interpolable scalar attribute.
    #[must_use]
    pub const fn scalar(name: &'static str) -> Self {
        Self {
            name,
            components: &[],
            interpolable: false,
            broadcastable: false,
        }
    }

    /// An interpolable vector attribute.
    #[must_use]
    pub const fn interpolable(name: &'static str, components: &'static [&'static str]) -> Self {
        Self {
            name,
            components,
            interpolable: true,
            broadcastable: false,
        }
    }

    /// Marks the attribute as broadcastable.
    #[must_use]
    pub const fn broadcast(mut self) -> Self {
        self.broadcastable = true;
        self
    }

    /// Number of float channels the attribute's values occupy.
    #[must_use]
    pub const fn component_count(&self) -> usize {
        if self.components.is_empty() {
            1
        } else {
            self.components.len()
        }
    }

    /// Iterates the channel names of this attribute's values.
    pub fn channel_names(&self) -> impl Iterator<Item = String> + '_ {
        let scalar = self.components.is_empty().then(|| String::from(self.name));
        scalar.into_iter().chain(self.components.iter().map(|c| {
            let mut name = String::from(self.name);
            name.push_str(c);
            name
        }))
    }
}

const XY: &[&str] = &["X", "Y"];
const WH: &[&str] = &["Width", "Height"];
const UVWH: &[&str] = &["U", "V", "Width", "Height"];
const RGBA: &[&str] = &["R", "G", "B", "Opacity"];

/// The default sprite attribute table.
pub const SPRITE_ATTRIBUTES: &[SpriteAttribute] = &[
    SpriteAttribute::scalar(TRANSITION_TIME_MS),
    SpriteAttribute::interpolable("PositionWorld", XY),
    SpriteAttribute::interpolable("SizeWorld", WH).broadcast(),
    SpriteAttribute::interpolable("GeometricZoom", XY).broadcast(),
    SpriteAttribute::interpolable("PositionPixel", XY),
    SpriteAttribute::interpolable("SizePixel", &[]),
    SpriteAttribute::interpolable("MaxSizePixel", &[]),
    SpriteAttribute::interpolable("MinSizePixel", &[]),
    SpriteAttribute::interpolable("PositionRelative", XY),
    SpriteAttribute::interpolable("Sides", &[]),
    SpriteAttribute::interpolable("ShapeTexture", UVWH),
    SpriteAttribute::interpolable("BorderRadiusWorld", &[]),
    SpriteAttribute::interpolable("BorderRadiusPixel", &[]),
    SpriteAttribute::interpolable("BorderPlacement", &[]),
    SpriteAttribute::interpolable("BorderColor", RGBA),
    SpriteAttribute::interpolable("FillBlend", &[]),
    SpriteAttribute::interpolable("FillColor", RGBA),
    SpriteAttribute::interpolable("FillTexture", UVWH),
];

/// Inputs to [`AttributeMapper::new`].
#[derive(Clone, Debug)]
pub struct MapperSettings {
    /// Floats per texel (4 for RGBA float textures).
    pub data_channel_count: usize,
    /// Upper bound on swatches wanted; `None` means "as many as fit".
    pub desired_swatch_capacity: Option<usize>,
    /// Maximum texture edge length in texels; `None` means unbounded.
    pub max_texture_size: Option<usize>,
    /// Attribute declarations, in layout order.
    pub attributes: Vec<SpriteAttribute>,
}

impl Default for MapperSettings {
    fn default() -> Self {
        Self {
            data_channel_count: 4,
            desired_swatch_capacity: None,
            max_texture_size: Some(2048),
            attributes: SPRITE_ATTRIBUTES.to_vec(),
        }
    }
}

impl MapperSettings {
    /// Default attributes with an explicit swatch capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            desired_swatch_capacity: Some(capacity),
            ..Self::default()
        }
    }
}

/// A computed swatch layout.
#[derive(Clone, Debug)]
pub struct AttributeMapper {
    data_channel_count: usize,
    texels_per_swatch: usize,
    values_per_swatch: usize,
    swatches_per_row: usize,
    texture_width: usize,
    texture_height: usize,
    total_swatches: usize,
    attributes: Vec<SpriteAttribute>,
    /// Channel names in swatch order.
    components: Vec<String>,
    /// Whether the channel at the same position is an interpolable value.
    interpolable: Vec<bool>,
    index_of: BTreeMap<String, usize>,
}

impl AttributeMapper {
    /// Computes the layout for `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when neither size nor capacity is
    /// bounded, when two channels would share a name, or when the texture
    /// cannot hold a single swatch.
    pub fn new(settings: &MapperSettings) -> Result<Self, ConfigurationError> {
        if settings.data_channel_count == 0 {
            return Err(ConfigurationError::NoDataChannels);
        }
        if settings.desired_swatch_capacity == Some(0) {
            return Err(ConfigurationError::ZeroCapacity);
        }
        if settings.desired_swatch_capacity.is_none() && settings.max_texture_size.is_none() {
            return Err(ConfigurationError::Unbounded);
        }

        let mut components = Vec::new();
        let mut interpolable = Vec::new();
        for attribute in &settings.attributes {
            if attribute.name.is_empty() {
                return Err(ConfigurationError::EmptyAttributeName);
            }
            for name in attribute.channel_names() {
                components.push(name);
                interpolable.push(attribute.interpolable);
            }
        }
        for attribute in settings.attributes.iter().filter(|a| a.interpolable) {
            for mut name in attribute.channel_names() {
                name.push_str(DELTA_SUFFIX);
                components.push(name);
                interpolable.push(false);
            }
        }

        let mut index_of = BTreeMap::new();
        for (index, name) in components.iter().enumerate() {
            if index_of.insert(name.clone(), index).is_some() {
                return Err(ConfigurationError::DuplicateComponent(name.clone()));
            }
        }

        let channels = settings.data_channel_count;
        let texels_per_swatch = components.len().div_ceil(channels).max(1);
        let values_per_swatch = texels_per_swatch * channels;

        let (mut swatches_per_row, mut texture_height) = match settings.max_texture_size {
            Some(max) => {
                let per_row = max / texels_per_swatch;
                if per_row == 0 {
                    return Err(ConfigurationError::TextureTooSmall {
                        max_texture_size: max,
                        texels_per_swatch,
                    });
                }
                (per_row, max)
            }
            // Unbounded texture: one row holding the whole capacity.
            None => (settings.desired_swatch_capacity.unwrap_or(1), 1),
        };

        if let Some(desired) = settings.desired_swatch_capacity {
            if swatches_per_row.saturating_mul(texture_height) > desired {
                swatches_per_row = swatches_per_row.min(desired);
                texture_height = desired.div_ceil(swatches_per_row);
            }
        }

        Ok(Self {
            data_channel_count: channels,
            texels_per_swatch,
            values_per_swatch,
            swatches_per_row,
            texture_width: texels_per_swatch * swatches_per_row,
            texture_height,
            total_swatches: swatches_per_row * texture_height,
            attributes: settings.attributes.clone(),
            components,
            interpolable,
            index_of,
        })
    }

    /// Floats per texel.
    #[must_use]
    pub fn data_channel_count(&self) -> usize {
        self.data_channel_count
    }

    /// Texels occupied by one swatch.
    #[must_use]
    pub fn texels_per_swatch(&self) -> usize {
        self.texels_per_swatch
    }

    /// Floats occupied by one swatch, including padding.
    #[must_use]
    pub fn values_per_swatch(&self) -> usize {
        self.values_per_swatch
    }

    /// Swatches per texture row.
    #[must_use]
    pub fn swatches_per_row(&self) -> usize {
        self.swatches_per_row
    }

    /// Floats per texture row.
    #[must_use]
    pub fn values_per_row(&self) -> usize {
        self.values_per_swatch * self.swatches_per_row
    }

    /// Texture width in texels.
    #[must_use]
    pub fn texture_width(&self) -> usize {
        self.texture_width
    }

    /// Texture height in texels.
    #[must_use]
    pub fn texture_height(&self) -> usize {
        self.texture_height
    }

    /// Number of swatches, i.e. the arena capacity.
    #[must_use]
    pub fn total_swatches(&self) -> usize {
        self.total_swatches
    }

    /// Number of mapped channels (values plus deltas), without padding.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Channel names in swatch order.
    #[must_use]
    pub fn component_names(&self) -> &[String] {
        &self.components
    }

    /// The declared attributes.
    #[must_use]
    pub fn attributes(&self) -> &[SpriteAttribute] {
        &self.attributes
    }

    /// Looks up an attribute declaration by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&SpriteAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Offset of the named channel within a swatch.
    #[must_use]
    pub fn component_index(&self, name: &str) -> Option<usize> {
        self.index_of.get(name).copied()
    }

    /// Offset of the delta channel belonging to the interpolable value
    /// channel at `index`.
    #[must_use]
    pub fn delta_index(&self, index: usize) -> Option<usize> {
        if !self.is_interpolable(index) {
            return None;
        }
        let mut name = self.components[index].clone();
        name.push_str(DELTA_SUFFIX);
        self.component_index(&name)
    }

    /// Whether the channel at `index` is an interpolable value.
    #[must_use]
    pub fn is_interpolable(&self, index: usize) -> bool {
        self.interpolable.get(index).copied().unwrap_or(false)
    }

    /// Texture row that holds swatch `index`.
    #[must_use]
    pub fn swatch_row(&self, index: usize) -> usize {
        index / self.swatches_per_row
    }

    /// Normalized texture coordinate of the centre of the first texel of
    /// swatch `index`.
    #[must_use]
    pub fn swatch_uv(&self, index: usize) -> [f32; 2] {
        let column = index % self.swatches_per_row;
        let row = index / self.swatches_per_row;
        let u = (column * self.texels_per_swatch) as f32 + 0.5;
        let v = row as f32 + 0.5;
        [u / self.texture_width as f32, v / self.texture_height as f32]
    }

    /// Inverse of [`swatch_uv`](Self::swatch_uv).
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "UVs are checked to lie in [0, 1) first"
    )]
    pub fn swatch_index_for_uv(&self, uv: [f32; 2]) -> Option<usize> {
        if !(0.0..1.0).contains(&uv[0]) || !(0.0..1.0).contains(&uv[1]) {
            return None;
        }
        let texel_x = (uv[0] * self.texture_width as f32) as usize;
        let texel_y = (uv[1] * self.texture_height as f32) as usize;
        let index = texel_y * self.swatches_per_row + texel_x / self.texels_per_swatch;
        (index < self.total_swatches).then_some(index)
    }
}

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeSet;
    use alloc::vec;

    use super::*;

    fn settings(
        channels: usize,
        capacity: Option<usize>,
        max: Option<usize>,
        attributes: Vec<SpriteAttribute>,
    ) -> MapperSettings {
        MapperSettings {
            data_channel_count: channels,
            desired_swatch_capacity: capacity,
            max_texture_size: max,
            attributes,
        }
    }

    fn check_layout_invariants(mapper: &AttributeMapper) {
        assert_eq!(
            mapper.total_swatches() * mapper.values_per_swatch(),
            mapper.texture_width() * mapper.texture_height() * mapper.data_channel_count(),
            "swatches tile the texture exactly"
        );
        assert!(
            mapper.texels_per_swatch() * mapper.data_channel_count() >= mapper.component_count(),
            "every channel fits in the swatch"
        );
        let indices: BTreeSet<_> = mapper
            .component_names()
            .iter()
            .map(|n| mapper.component_index(n))
            .collect();
        assert_eq!(indices.len(), mapper.component_count(), "injective names");
    }

    #[test]
    fn default_attributes_lay_out() {
        let mapper = AttributeMapper::new(&MapperSettings::default()).unwrap();
        check_layout_invariants(&mapper);
        assert_eq!(mapper.component_index(TRANSITION_TIME_MS), Some(0));
        assert_eq!(mapper.component_index("PositionWorldX"), Some(1));
        assert_eq!(mapper.component_index("PositionWorldY"), Some(2));
        assert_eq!(mapper.texture_height(), 2048);
    }

    #[test]
    fn deltas_follow_all_values() {
        let attributes = vec![
            SpriteAttribute::scalar("T"),
            SpriteAttribute::interpolable("Pos", &["X", "Y"]),
            SpriteAttribute::interpolable("Size", &[]),
        ];
        let mapper = AttributeMapper::new(&settings(4, Some(10), Some(64), attributes)).unwrap();
        let names: Vec<&str> = mapper.component_names().iter().map(String::as_str).collect();
        assert_eq!(
            names,
            ["T", "PosX", "PosY", "Size", "PosXDelta", "PosYDelta", "SizeDelta"]
        );
        assert_eq!(mapper.texels_per_swatch(), 2, "7 channels need 2 RGBA texels");
        assert_eq!(mapper.values_per_swatch(), 8);
        assert_eq!(mapper.delta_index(1), Some(4));
        assert_eq!(mapper.delta_index(3), Some(6));
        assert_eq!(mapper.delta_index(0), None, "scalar T is not interpolable");
        assert_eq!(mapper.delta_index(4), None, "deltas have no deltas");
    }

    #[test]
    fn capacity_shrinks_rows() {
        let attributes = vec![SpriteAttribute::interpolable("Pos", &["X", "Y"])];
        // 4 channels -> 1 texel per swatch, 64 per row, 64 rows = 4096 > 100.
        let mapper = AttributeMapper::new(&settings(4, Some(100), Some(64), attributes)).unwrap();
        check_layout_invariants(&mapper);
        assert_eq!(mapper.swatches_per_row(), 64);
        assert_eq!(mapper.texture_height(), 2);
        assert_eq!(mapper.total_swatches(), 128, "rounded up to whole rows");
        assert_eq!(mapper.texture_width(), 64);
    }

    #[test]
    fn tiny_capacity_is_a_single_row() {
        let mapper = AttributeMapper::new(&MapperSettings::with_capacity(4)).unwrap();
        check_layout_invariants(&mapper);
        assert_eq!(mapper.total_swatches(), 4);
        assert_eq!(mapper.texture_height(), 1);
        assert_eq!(mapper.swatches_per_row(), 4);
    }

    #[test]
    fn unbounded_texture_uses_capacity() {
        let attributes = vec![SpriteAttribute::scalar("A")];
        let mapper = AttributeMapper::new(&settings(1, Some(33), None, attributes)).unwrap();
        check_layout_invariants(&mapper);
        assert_eq!(mapper.total_swatches(), 33);
        assert_eq!(mapper.texture_height(), 1);
    }

    #[test]
    fn layout_invariants_hold_across_configs() {
        for channels in 1..=4 {
            for capacity in [None, Some(1), Some(7), Some(1000)] {
                for max in [Some(16), Some(37), Some(256)] {
                    let s = settings(channels, capacity, max, SPRITE_ATTRIBUTES.to_vec());
                    match AttributeMapper::new(&s) {
                        Ok(mapper) => {
                            check_layout_invariants(&mapper);
                            if let Some(capacity) = capacity {
                                assert!(
                                    mapper.total_swatches() < capacity
                                        || mapper.total_swatches() - capacity
                                            < mapper.swatches_per_row(),
                                    "capacity is rounded up to at most one extra row"
                                );
                            }
                        }
                        Err(ConfigurationError::TextureTooSmall { .. }) => {}
                        Err(e) => panic!("unexpected error {e:?}"),
                    }
                }
            }
        }
    }

    #[test]
    fn unbounded_everything_is_rejected() {
        let s = settings(4, None, None, SPRITE_ATTRIBUTES.to_vec());
        assert_eq!(AttributeMapper::new(&s).unwrap_err(), ConfigurationError::Unbounded);
    }

    #[test]
    fn colliding_component_names_are_rejected() {
        let attributes = vec![
            SpriteAttribute::interpolable("Size", &["X"]),
            SpriteAttribute::scalar("SizeX"),
        ];
        let err = AttributeMapper::new(&settings(4, Some(4), Some(16), attributes)).unwrap_err();
        assert_eq!(err, ConfigurationError::DuplicateComponent("SizeX".into()));
    }

    #[test]
    fn delta_names_can_collide_too() {
        let attributes = vec![
            SpriteAttribute::interpolable("Size", &[]),
            SpriteAttribute::scalar("SizeDelta"),
        ];
        let err = AttributeMapper::new(&settings(4, Some(4), Some(16), attributes)).unwrap_err();
        assert_eq!(err, ConfigurationError::DuplicateComponent("SizeDelta".into()));
    }

    #[test]
    fn too_small_texture_is_rejected() {
        let s = settings(1, Some(4), Some(3), SPRITE_ATTRIBUTES.to_vec());
        assert!(matches!(
            AttributeMapper::new(&s),
            Err(ConfigurationError::TextureTooSmall { max_texture_size: 3, .. })
        ));
    }

    #[test]
    fn uv_round_trips_to_index() {
        let mapper = AttributeMapper::new(&MapperSettings::with_capacity(300)).unwrap();
        for index in [0, 1, 17, mapper.swatches_per_row(), 299] {
            let uv = mapper.swatch_uv(index);
            assert_eq!(mapper.swatch_index_for_uv(uv), Some(index), "uv {uv:?}");
        }
        assert_eq!(mapper.swatch_index_for_uv([1.5, 0.0]), None);
    }

    #[test]
    fn rows_follow_swatches_per_row() {
        let attributes = vec![SpriteAttribute::scalar("A")];
        let mapper = AttributeMapper::new(&settings(1, Some(10), Some(4), attributes)).unwrap();
        assert_eq!(mapper.swatches_per_row(), 4);
        assert_eq!(mapper.swatch_row(3), 0);
        assert_eq!(mapper.swatch_row(4), 1);
        assert_eq!(mapper.swatch_row(9), 2);
        assert_eq!(mapper.values_per_row(), 4);
    }
}
