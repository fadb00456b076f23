pub const INPUT_DIMENSION: usize = 2;
pub const TARGET_DIMENSION: usize = 1;

/// One point of the ring task. Raw coordinates live in [-1, 1], transformed ones in volts.
pub type Sample = [f32; INPUT_DIMENSION];
/// Label vector; the first component is the class (0 or 1).
pub type Target = [f32; TARGET_DIMENSION];

pub type InputsVec = Vec<Sample>;
pub type TargetsVec = Vec<Target>;

/// Class membership as used by the metrics and the plots.
pub fn is_class_one(target: &Target) -> bool {
  target[0] >= 0.5
}
