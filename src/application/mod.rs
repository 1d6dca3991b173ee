// Application layer - Use cases and ports
pub mod board_source;
pub mod order_service;
