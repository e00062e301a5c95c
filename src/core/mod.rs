pub mod browser;
pub mod engine;
pub mod ffmpeg;
pub mod http;
pub mod manager;
pub mod ytdlp;
