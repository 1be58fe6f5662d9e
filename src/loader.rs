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

//! Shader source loading. Sources are either read at run time (file system on desktop, `fetch`
//! in the browser) or compiled into the binary, see [`default_resolver`].

use crate::core::{
    futures::future::{try_join, try_join_all, LocalBoxFuture},
    io::{self, FileLoadError},
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    string::FromUtf8Error,
};

/// Why a single source could not be obtained.
#[derive(Debug, thiserror::Error)]
pub enum LoadFailure {
    #[error(transparent)]
    File(#[from] FileLoadError),
    #[error("source is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),
    #[error("no embedded source named {0}")]
    NotEmbedded(String),
}

#[derive(Debug, thiserror::Error)]
#[error("Unable to load shader source {locator}: {reason}")]
pub struct ShaderLoadError {
    pub locator: String,
    #[source]
    pub reason: LoadFailure,
}

/// Turns a locator (a path or an URL) into shader text.
pub trait SourceResolver {
    fn resolve<'a>(&'a self, locator: &'a str) -> LocalBoxFuture<'a, Result<String, LoadFailure>>;
}

/// Reads sources through [`io::load_file`], relative to an optional root.
#[derive(Clone, Debug, Default)]
pub struct FetchResolver {
    root: Option<PathBuf>,
}

impl FetchResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: Some(root.as_ref().to_owned()),
        }
    }

    fn full_path(&self, locator: &str) -> PathBuf {
        match self.root {
            Some(ref root) => root.join(locator),
            None => PathBuf::from(locator),
        }
    }
}

impl SourceResolver for FetchResolver {
    fn resolve<'a>(&'a self, locator: &'a str) -> LocalBoxFuture<'a, Result<String, LoadFailure>> {
        Box::pin(async move {
            let bytes = io::load_file(self.full_path(locator)).await?;
            Ok(String::from_utf8(bytes)?)
        })
    }
}

/// Serves sources compiled into the binary, looked up by the file name of the locator.
#[derive(Clone, Debug)]
pub struct EmbeddedResolver {
    sources: Vec<(&'static str, &'static str)>,
}

impl Default for EmbeddedResolver {
    fn default() -> Self {
        Self {
            sources: vec![
                (
                    "triangle.vert",
                    include_str!("../data/shaders/triangle.vert"),
                ),
                (
                    "triangle.frag",
                    include_str!("../data/shaders/triangle.frag"),
                ),
            ],
        }
    }
}

impl EmbeddedResolver {
    /// An empty resolver, see [`Self::with_source`].
    pub fn empty() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Registers a source. A later registration of the same name shadows the earlier one.
    pub fn with_source(mut self, name: &'static str, source: &'static str) -> Self {
        self.sources.push((name, source));
        self
    }

    fn find(&self, locator: &str) -> Option<&'static str> {
        let name = Path::new(locator).file_name()?.to_str()?;
        self.sources
            .iter()
            .rev()
            .find(|(n, _)| *n == name)
            .map(|(_, source)| *source)
    }
}

impl SourceResolver for EmbeddedResolver {
    fn resolve<'a>(&'a self, locator: &'a str) -> LocalBoxFuture<'a, Result<String, LoadFailure>> {
        let result = self
            .find(locator)
            .map(str::to_owned)
            .ok_or_else(|| LoadFailure::NotEmbedded(locator.to_owned()));
        Box::pin(async move { result })
    }
}

/// The resolver selected at build time by the `embedded-shaders` feature.
pub fn default_resolver() -> Box<dyn SourceResolver> {
    #[cfg(feature = "embedded-shaders")]
    {
        Box::new(EmbeddedResolver::default())
    }

    #[cfg(not(feature = "embedded-shaders"))]
    {
        Box::new(FetchResolver::new())
    }
}

/// Where the two stages of the triangle program come from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderLocators {
    pub vertex: String,
    pub fragment: String,
}

impl Default for ShaderLocators {
    fn default() -> Self {
        Self {
            vertex: "data/shaders/triangle.vert".to_owned(),
            fragment: "data/shaders/triangle.frag".to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

pub struct ShaderLoader {
    resolver: Box<dyn SourceResolver>,
}

impl Default for ShaderLoader {
    fn default() -> Self {
        Self {
            resolver: default_resolver(),
        }
    }
}

impl ShaderLoader {
    pub fn new<R: SourceResolver + 'static>(resolver: R) -> Self {
        Self {
            resolver: Box::new(resolver),
        }
    }

    pub async fn load_source(&self, locator: &str) -> Result<String, ShaderLoadError> {
        self.resolver
            .resolve(locator)
            .await
            .map_err(|reason| ShaderLoadError {
                locator: locator.to_owned(),
                reason,
            })
    }

    /// Loads both stages concurrently. Fails with the first error, nothing is returned partially.
    pub async fn load_all(
        &self,
        locators: &ShaderLocators,
    ) -> Result<ShaderSources, ShaderLoadError> {
        let (vertex, fragment) = try_join(
            self.load_source(&locators.vertex),
            self.load_source(&locators.fragment),
        )
        .await?;

        Ok(ShaderSources { vertex, fragment })
    }

    /// Loads an arbitrary set of named sources concurrently, keyed the same way as `locators`.
    pub async fn load_named(
        &self,
        locators: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>, ShaderLoadError> {
        let sources = try_join_all(locators.iter().map(|(name, locator)| async move {
            self.load_source(locator)
                .await
                .map(|source| (name.clone(), source))
        }))
        .await?;

        Ok(sources.into_iter().collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::futures::executor::block_on;
    use std::collections::HashMap;

    struct MapResolver {
        sources: HashMap<&'static str, &'static str>,
    }

    impl MapResolver {
        fn new(sources: &[(&'static str, &'static str)]) -> Self {
            Self {
                sources: sources.iter().copied().collect(),
            }
        }
    }

    impl SourceResolver for MapResolver {
        fn resolve<'a>(
            &'a self,
            locator: &'a str,
        ) -> LocalBoxFuture<'a, Result<String, LoadFailure>> {
            Box::pin(async move {
                self.sources
                    .get(locator)
                    .map(|s| s.to_string())
                    .ok_or_else(|| {
                        LoadFailure::File(FileLoadError::Http {
                            status: 404,
                            status_text: "Not Found".to_owned(),
                        })
                    })
            })
        }
    }

    #[test]
    fn load_all_returns_both_stages() {
        let loader = ShaderLoader::new(MapResolver::new(&[
            ("v.glsl", "vertex"),
            ("f.glsl", "fragment"),
        ]));
        let sources = block_on(loader.load_all(&ShaderLocators {
            vertex: "v.glsl".to_owned(),
            fragment: "f.glsl".to_owned(),
        }))
        .unwrap();
        assert_eq!(sources.vertex, "vertex");
        assert_eq!(sources.fragment, "fragment");
    }

    #[test]
    fn failing_entry_fails_whole_batch() {
        let loader = ShaderLoader::new(MapResolver::new(&[("a.glsl", "a")]));
        let locators = BTreeMap::from([
            ("a".to_owned(), "a.glsl".to_owned()),
            ("b".to_owned(), "b.glsl".to_owned()),
        ]);
        let error = block_on(loader.load_named(&locators)).unwrap_err();
        assert_eq!(error.locator, "b.glsl");
        assert!(matches!(
            error.reason,
            LoadFailure::File(FileLoadError::Http { status: 404, .. })
        ));
    }

    #[test]
    fn named_sources_keep_their_keys() {
        let loader = ShaderLoader::new(MapResolver::new(&[("a.glsl", "a"), ("b.glsl", "b")]));
        let locators = BTreeMap::from([
            ("first".to_owned(), "a.glsl".to_owned()),
            ("second".to_owned(), "b.glsl".to_owned()),
        ]);
        let sources = block_on(loader.load_named(&locators)).unwrap();
        assert_eq!(sources["first"], "a");
        assert_eq!(sources["second"], "b");
    }

    #[test]
    fn embedded_lookup_uses_file_name() {
        let resolver = EmbeddedResolver::default();
        let source = block_on(resolver.resolve("some/dir/triangle.vert")).unwrap();
        assert!(source.contains("a_position"));
        assert!(matches!(
            block_on(resolver.resolve("missing.vert")),
            Err(LoadFailure::NotEmbedded(_))
        ));
    }

    #[test]
    fn embedded_sources_can_be_shadowed() {
        let resolver = EmbeddedResolver::empty()
            .with_source("a.vert", "old")
            .with_source("a.vert", "new");
        assert_eq!(block_on(resolver.resolve("a.vert")).unwrap(), "new");
    }

    #[test]
    fn fetch_resolver_reads_relative_to_root() {
        let resolver = FetchResolver::with_root(env!("CARGO_MANIFEST_DIR"));
        let source = block_on(resolver.resolve("data/shaders/triangle.frag")).unwrap();
        assert!(source.starts_with("#version 300 es"));
    }

    #[test]
    fn fetch_resolver_reports_missing_file() {
        let loader = ShaderLoader::new(FetchResolver::with_root(env!("CARGO_MANIFEST_DIR")));
        let error = block_on(loader.load_source("data/shaders/missing.vert")).unwrap_err();
        assert_eq!(error.locator, "data/shaders/missing.vert");
        assert!(matches!(error.reason, LoadFailure::File(FileLoadError::Io(_))));
    }
}
