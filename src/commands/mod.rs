pub mod dump;
pub mod init;
pub mod recall;
pub mod resolve;
pub mod sync;
