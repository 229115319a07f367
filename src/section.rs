// Copyright 2025 Pants project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::fmt;

///
/// A configuration scope that bears are bound to.
///
/// The core treats sections purely by identity: bears sharing an `Arc<Section>` belong to the
/// same scope, and dependency instances are shared within it. Only the file collaborators in
/// `crate::files` interpret the glob lists.
///
#[derive(Clone, Debug)]
pub struct Section {
    name: String,
    files: Vec<String>,
    ignore: Vec<String>,
    limit_files: Vec<String>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Section {
        Section {
            name: name.into(),
            files: Vec::new(),
            ignore: Vec::new(),
            limit_files: Vec::new(),
        }
    }

    /// Glob patterns selecting the files this section analyzes.
    pub fn with_files<I, S>(mut self, globs: I) -> Section
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files = globs.into_iter().map(Into::into).collect();
        self
    }

    /// Glob patterns for paths to exclude from analysis.
    pub fn with_ignore<I, S>(mut self, globs: I) -> Section
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore = globs.into_iter().map(Into::into).collect();
        self
    }

    /// When non-empty, only paths matching one of these patterns are kept.
    pub fn with_limit_files<I, S>(mut self, globs: I) -> Section
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.limit_files = globs.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn ignore(&self) -> &[String] {
        &self.ignore
    }

    pub fn limit_files(&self) -> &[String] {
        &self.limit_files
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
