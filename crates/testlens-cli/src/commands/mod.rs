pub mod discover;
pub mod init;
pub mod replay;
pub mod run;
