// Copyright (c) 2019-present Dmitry Stepanov and Fyrox Engine contributors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Application settings, stored in RON next to the executable's working directory.

use crate::{
    core::log::Log,
    graphics::context::ContextOptions,
    loader::ShaderLocators,
};
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::{fs::File, path::Path};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed settings: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("unable to serialize settings: {0}")]
    Serialize(#[from] ron::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriangleSettings {
    pub title: String,
    /// Logical size of the window. Ignored when the canvas is sized by the page.
    pub width: u32,
    pub height: u32,
    pub context: ContextOptions,
    pub shaders: ShaderLocators,
    /// Directory the shader locators are resolved against, current directory if absent.
    pub shader_root: Option<String>,
}

impl Default for TriangleSettings {
    fn default() -> Self {
        Self {
            title: "Tricolor".to_owned(),
            width: 800,
            height: 600,
            context: ContextOptions {
                alpha: false,
                ..Default::default()
            },
            shaders: Default::default(),
            shader_root: None,
        }
    }
}

impl TriangleSettings {
    pub const FILE_NAME: &'static str = "tricolor.ron";

    pub fn from_ron(text: &str) -> Result<Self, SettingsError> {
        Ok(ron::de::from_str(text)?)
    }

    pub fn to_ron(&self) -> Result<String, SettingsError> {
        Ok(ron::ser::to_string_pretty(self, PrettyConfig::default())?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let file = File::open(path)?;
        Ok(ron::de::from_reader(file)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let file = File::create(path)?;
        ron::ser::to_writer_pretty(file, self, PrettyConfig::default())?;
        Ok(())
    }

    /// Loads the settings, falling back to defaults when the file is missing or malformed.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(settings) => {
                Log::info(format!("Settings loaded from {}", path.display()));
                settings
            }
            Err(SettingsError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Log::info(format!(
                    "No settings at {}, using defaults",
                    path.display()
                ));
                Self::default()
            }
            Err(e) => {
                Log::warn(format!(
                    "Unable to load settings from {}: {e}. Using defaults",
                    path.display()
                ));
                Self::default()
            }
        }
    }
}
