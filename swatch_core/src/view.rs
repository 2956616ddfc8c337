// Copyright 2026 the Swatch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Named read/write access to one sprite's swatch.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::attributes::{AttributeMapper, SpriteAttribute, TRANSITION_TIME_MS};
use crate::error::AttributeError;

/// A projection over a swatch that addresses floats by channel and
/// attribute name.
///
/// Callbacks receive a view over a private copy of the sprite's target
/// values; whatever the callback leaves behind is written back when it
/// returns, even if it fails.
pub struct SpriteView<'a> {
    mapper: &'a AttributeMapper,
    values: &'a mut [f32],
}

impl fmt::Debug for SpriteView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in self.mapper.component_names().iter().zip(self.values.iter()) {
            map.entry(name, value);
        }
        map.finish()
    }
}

impl<'a> SpriteView<'a> {
    /// Wraps `values`, which must be exactly one swatch long.
    ///
    /// # Panics
    ///
    /// Panics if `values` is not `values_per_swatch` long.
    #[must_use]
    pub fn new(mapper: &'a AttributeMapper, values: &'a mut [f32]) -> Self {
        assert_eq!(
            values.len(),
            mapper.values_per_swatch(),
            "a view covers exactly one swatch"
        );
        Self { mapper, values }
    }

    /// The raw swatch values, including padding.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        self.values
    }

    /// Reads one channel, e.g. `"PositionWorldX"`.
    ///
    /// # Errors
    ///
    /// [`AttributeError::UnknownComponent`] for an unmapped name.
    pub fn get(&self, component: &str) -> Result<f32, AttributeError> {
        Ok(self.values[self.index(component)?])
    }

    /// Writes one channel.
    ///
    /// # Errors
    ///
    /// [`AttributeError::UnknownComponent`] for an unmapped name.
    pub fn set(&mut self, component: &str, value: f32) -> Result<(), AttributeError> {
        let index = self.index(component)?;
        self.values[index] = value;
        Ok(())
    }

    /// Reads every component of an attribute, e.g. `"FillColor"`.
    ///
    /// # Errors
    ///
    /// [`AttributeError::UnknownAttribute`] for an undeclared attribute.
    pub fn attribute(&self, name: &str) -> Result<Vec<f32>, AttributeError> {
        let attribute = self.lookup(name)?;
        attribute
            .channel_names()
            .map(|channel| self.get(&channel))
            .collect()
    }

    /// Writes every component of an attribute.
    ///
    /// A single value is broadcast to all components when the attribute is
    /// broadcastable.
    ///
    /// # Errors
    ///
    /// [`AttributeError::UnknownAttribute`] for an undeclared attribute and
    /// [`AttributeError::Arity`] when the number of values does not fit.
    pub fn set_attribute(&mut self, name: &str, values: &[f32]) -> Result<(), AttributeError> {
        let attribute = *self.lookup(name)?;
        let expected = attribute.component_count();
        let broadcast = values.len() == 1 && attribute.broadcastable;
        if values.len() != expected && !broadcast {
            return Err(AttributeError::Arity {
                name: String::from(name),
                expected,
                actual: values.len(),
            });
        }
        for (i, channel) in attribute.channel_names().enumerate() {
            let value = if broadcast { values[0] } else { values[i] };
            self.set(&channel, value)?;
        }
        Ok(())
    }

    /// How long the transition started by this callback lasts.
    ///
    /// # Errors
    ///
    /// [`AttributeError::UnknownComponent`] if the layout has no
    /// `TransitionTimeMs` channel.
    pub fn transition_time_ms(&self) -> Result<f32, AttributeError> {
        self.get(TRANSITION_TIME_MS)
    }

    /// Sets the transition duration. Negative durations act as zero.
    ///
    /// # Errors
    ///
    /// See [`transition_time_ms`](Self::transition_time_ms).
    pub fn set_transition_time_ms(&mut self, millis: f32) -> Result<(), AttributeError> {
        self.set(TRANSITION_TIME_MS, millis)
    }

    /// Sets `PositionWorld`.
    ///
    /// # Errors
    ///
    /// See [`set_attribute`](Self::set_attribute).
    pub fn set_position_world(&mut self, x: f32, y: f32) -> Result<(), AttributeError> {
        self.set_attribute("PositionWorld", &[x, y])
    }

    /// Sets `SizeWorld`.
    ///
    /// # Errors
    ///
    /// See [`set_attribute`](Self::set_attribute).
    pub fn set_size_world(&mut self, width: f32, height: f32) -> Result<(), AttributeError> {
        self.set_attribute("SizeWorld", &[width, height])
    }

    /// Sets `FillColor` as RGBA.
    ///
    /// # Errors
    ///
    /// See [`set_attribute`](Self::set_attribute).
    pub fn set_fill_color(&mut self, rgba: [f32; 4]) -> Result<(), AttributeError> {
        self.set_attribute("FillColor", &rgba)
    }

    /// Sets `BorderColor` as RGBA.
    ///
    /// # Errors
    ///
    /// See [`set_attribute`](Self::set_attribute).
    pub fn set_border_color(&mut self, rgba: [f32; 4]) -> Result<(), AttributeError> {
        self.set_attribute("BorderColor", &rgba)
    }

    fn index(&self, component: &str) -> Result<usize, AttributeError> {
        self.mapper
            .component_index(component)
            .ok_or_else(|| AttributeError::UnknownComponent(String::from(component)))
    }

    fn lookup(&self, name: &str) -> Result<&'a SpriteAttribute, AttributeError> {
        let mapper: &'a AttributeMapper = self.mapper;
        mapper
            .attribute(name)
            .ok_or_else(|| AttributeError::UnknownAttribute(String::from(name)))
    }
}
