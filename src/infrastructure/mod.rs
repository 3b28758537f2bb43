pub mod audio_io;
pub mod batch;
