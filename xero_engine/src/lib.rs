/*!
# Xero Engine

Backend-agnostic core of the Xero shader pipeline.

Shader source files carrying `#type <stage>` markers are split per stage,
compiled to binaries (with an on-disk cache), reflected into a unified
descriptor-set model and turned into descriptor-set layouts and pools.
The graphics API is reached only through capability traits that backend
crates implement.

## Architecture

- **ShaderDevice**: GPU device context (modules, layouts, pools, sets)
- **ShaderCompiler**: compilation backend (GLSL -> SPIR-V)
- **StageReflector**: binary introspection
- **ShaderBackend**: the three capabilities plus `ShaderConfig`, chosen once at startup
- **Shader**: load pipeline for one source file
- **ShaderLibrary**: name -> shared shader
- **DescriptorPoolManager**: centralized, growing descriptor pool allocator
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod config;
pub mod shader;

// Main xero namespace module
pub mod xero {
    // Error types
    pub use crate::error::{Error, OrFatal, Result};

    // Logging entry point
    pub use crate::engine::Engine;

    // Logging sub-module (types only, macros are exported at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Configuration sub-module
    pub mod config {
        pub use crate::config::*;
    }

    // Shader pipeline sub-module
    pub mod shader {
        pub use crate::shader::*;
    }
}
