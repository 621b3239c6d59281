//! Multivision-Common: identifiers and errors shared across multivision.
//!
//! - **Typed indices**: [`CameraIndex`] (one-based) and [`SegmentIndex`]
//!   (zero-based) so camera and segment numbers cannot be mixed up
//! - **Entity keys**: [`EntityKey`] addresses one camera feed or the shared
//!   audio track inside a multiplexed segment
//! - **Tracks**: [`Track`] names the buffer sink a mutation targets
//! - **Error Handling**: common error type and result alias
//!
//! # Examples
//!
//! ```
//! use multivision_common::{CameraIndex, EntityKey, SegmentIndex};
//!
//! let camera = CameraIndex::FIRST.step(2, 4).unwrap();
//! assert_eq!(camera.get(), 3);
//! assert_eq!(EntityKey::Camera(camera).to_string(), "camera 3");
//!
//! let pivot = SegmentIndex::new(0);
//! assert_eq!(pivot.checked_sub(1), None);
//! ```

pub mod error;
pub mod ids;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
