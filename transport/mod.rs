// Transport module: one capability set, many channel backends
pub mod traits;
pub mod tcp;
pub mod unix;
pub mod pipe;
pub mod shm;
pub mod tls;
pub mod plugin;
pub mod fuzz;
pub mod buffered;
pub mod handle;

pub use traits::*;
pub use tcp::*;
pub use unix::*;
pub use pipe::*;
pub use shm::*;
pub use tls::*;
pub use plugin::*;
pub use fuzz::*;
pub use buffered::*;
pub use handle::*;
