/*!
 * Mailbox Ports
 * Numbered, bounded, process-wide FIFO channels for inter-job communication
 */

pub mod manager;
pub mod port;

pub use manager::PortManager;
pub use port::PortValue;
