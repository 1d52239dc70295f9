pub use anyhow::{ensure, format_err, Result};
pub use noisy_float::prelude::*;
