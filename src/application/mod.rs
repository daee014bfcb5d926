pub mod dto;
pub mod ports;
pub mod services;
pub mod store;

#[cfg(test)]
pub mod testing;
