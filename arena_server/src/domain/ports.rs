// Port for retrieving the current time.
//
// Milliseconds since the Unix epoch; used for elapsed-time physics, fire
// cooldowns and snapshot timestamps.
pub trait Clock: Send {
    fn now_millis(&self) -> u64;
}
