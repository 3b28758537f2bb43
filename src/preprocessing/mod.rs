pub mod noise_floor;
pub mod permutation;
pub mod segmenter;
pub mod silence;
