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

//! Asynchronous file loading. Reads from the file system on desktop and performs an HTTP `GET`
//! through `fetch` in the browser.

use std::{fmt, path::Path};

#[derive(Debug)]
pub enum FileLoadError {
    Io(std::io::Error),
    /// The server answered, but with a non-successful status.
    Http { status: u16, status_text: String },
    Custom(String),
}

impl fmt::Display for FileLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileLoadError::Io(e) => write!(f, "io error: {e}"),
            FileLoadError::Http {
                status,
                status_text,
            } => write!(f, "request failed with status {status} {status_text}"),
            FileLoadError::Custom(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for FileLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileLoadError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FileLoadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(target_arch = "wasm32")]
impl From<wasm_bindgen::JsValue> for FileLoadError {
    fn from(value: wasm_bindgen::JsValue) -> Self {
        let string = match js_sys::JSON::stringify(&value) {
            Ok(string) => String::from(string),
            Err(_) => format!("{value:?}"),
        };
        Self::Custom(string)
    }
}

/// Loads the whole file into memory.
pub async fn load_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, FileLoadError> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        Ok(std::fs::read(path)?)
    }

    #[cfg(target_arch = "wasm32")]
    {
        use js_sys::Uint8Array;
        use wasm_bindgen::JsCast;
        use wasm_bindgen_futures::JsFuture;

        let window =
            web_sys::window().ok_or_else(|| FileLoadError::Custom("Window not found!".to_owned()))?;
        let url = path
            .as_ref()
            .to_str()
            .ok_or_else(|| FileLoadError::Custom("Path is not valid UTF-8".to_owned()))?;

        let response: web_sys::Response = JsFuture::from(window.fetch_with_str(url))
            .await?
            .dyn_into()?;

        if !response.ok() {
            return Err(FileLoadError::Http {
                status: response.status(),
                status_text: response.status_text(),
            });
        }

        let data = JsFuture::from(response.array_buffer()?).await?;
        Ok(Uint8Array::new(&data).to_vec())
    }
}

/// Loads the whole file and interprets it as UTF-8 text.
pub async fn load_text<P: AsRef<Path>>(path: P) -> Result<String, FileLoadError> {
    let bytes = load_file(path).await?;
    String::from_utf8(bytes).map_err(|e| FileLoadError::Custom(format!("Invalid UTF-8: {e}")))
}

#[cfg(test)]
mod test {
    use super::{load_file, load_text, FileLoadError};
    use futures::executor::block_on;

    #[test]
    fn missing_file_is_io_error() {
        let result = block_on(load_file("this/file/does/not/exist.glsl"));
        assert!(matches!(result, Err(FileLoadError::Io(_))));
    }

    #[test]
    fn loads_text_from_disk() {
        let path = std::env::temp_dir().join("tricolor_core_io_test.txt");
        std::fs::write(&path, "void main() {}").unwrap();
        assert_eq!(block_on(load_text(&path)).unwrap(), "void main() {}");
        let _ = std::fs::remove_file(path);
    }
}
