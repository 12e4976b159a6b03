pub mod catalog;
pub mod events;
pub mod notification;
pub mod order;
pub mod payment;
