pub mod clock;
pub mod rng;

pub use clock::SystemClock;
pub use rng::rand_id;
