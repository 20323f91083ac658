pub mod db;
pub mod dimension;
pub mod extract;
pub mod load;
pub mod model;
pub mod pipeline;
pub mod resolve;
pub mod stage;
pub mod tracing;
pub mod transfer;

pub mod util {
    pub mod env;
}
