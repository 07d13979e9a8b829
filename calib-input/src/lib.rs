//! Serves a cached calibration array in fixed-size batches for a quantizer's calibration loop.
//!
//! The archive is loaded once into a [`CalibData`] owned by the caller.
//! [`CalibData::get_batch`] maps an iteration index to rows
//! `[i * batch_size, (i + 1) * batch_size)` under a single input name.
//! The driver picks the indices and decides when to stop.
//!
//! ```no_run
//! use calib_input::CalibData;
//!
//! let calib = CalibData::open().unwrap();
//! for i in 0..4 {
//!     let batch = calib.get_batch(i);
//!     println!("{:?}", batch["input_1"].shape());
//! }
//! ```

mod calib;
mod config;
mod error;

pub use calib::{CalibData, NamedBatch};
pub use config::{CalibConfig, BATCH_SIZE, DEFAULT_INPUT_NAME, DEFAULT_KEY, DEFAULT_PATH};
pub use error::StorageAccessError;
pub use npzs::{NpyDType, NpyView};
