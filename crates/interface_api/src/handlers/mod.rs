//! Request handlers
//!
//! Handlers validate the body, convert it to a domain request, call one
//! service and map the result to a response DTO.

pub mod health;
pub mod discount;
pub mod tax;
pub mod invoice;
