// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Defines the hierarchy of error types for the rendering subsystem.

use crate::renderer::api::ShaderStage;
use std::fmt;

/// An error raised while turning composed shader source into a program.
///
/// Both variants carry the offending source text so the failure can be
/// reproduced outside the engine.
#[derive(Debug, Clone)]
pub enum ShaderError {
    /// One stage failed to compile.
    CompilationFailure {
        /// The stage that failed.
        stage: ShaderStage,
        /// Label of the program being built (the state signature).
        label: String,
        /// The full source text of the failing stage.
        source: String,
        /// Diagnostics reported by the backend compiler.
        log: String,
    },
    /// Both stages compiled but linking or validation failed.
    LinkFailure {
        /// Label of the program being built (the state signature).
        label: String,
        /// Vertex stage source.
        vertex_source: String,
        /// Fragment stage source.
        fragment_source: String,
        /// Diagnostics reported by the backend linker.
        log: String,
    },
}

impl ShaderError {
    /// The label (state signature) of the program that failed.
    pub fn label(&self) -> &str {
        match self {
            ShaderError::CompilationFailure { label, .. } => label,
            ShaderError::LinkFailure { label, .. } => label,
        }
    }
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::CompilationFailure {
                stage, label, log, ..
            } => {
                write!(f, "Shader compilation failed ({stage} stage) for '{label}': {log}")
            }
            ShaderError::LinkFailure { label, log, .. } => {
                write!(f, "Shader link failed for '{label}': {log}")
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// An error related to the creation or use of a GPU resource.
#[derive(Debug, Clone)]
pub enum ResourceError {
    /// A shader-specific error occurred.
    Shader(ShaderError),
    /// The backend could not allocate a buffer, texture or framebuffer.
    AllocationFailed {
        /// What kind of resource was requested.
        resource: &'static str,
        /// Context reported by the backend.
        details: String,
    },
    /// The handle or ID used to reference a resource is invalid.
    InvalidHandle,
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Shader(err) => write!(f, "Shader resource error: {err}"),
            ResourceError::AllocationFailed { resource, details } => {
                write!(f, "Failed to allocate {resource}: {details}")
            }
            ResourceError::InvalidHandle => write!(f, "Invalid resource handle or ID."),
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Shader(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShaderError> for ResourceError {
    fn from(err: ShaderError) -> Self {
        ResourceError::Shader(err)
    }
}
