/// Spatial input size of the rice classifier model (width, height).
pub const CLASSIFIER_INPUT_SIZE: (u32, u32) = (224, 224);

/// Spatial input size of the rice detector model (width, height).
pub const DETECTOR_INPUT_SIZE: (u32, u32) = (640, 640);

/// Channels per pixel in both the decoded image and the packed tensor.
pub const CHANNELS: usize = 3;

/// Divisor mapping an 8-bit channel onto [0.0, 1.0].
pub const CHANNEL_SCALE: f32 = 255.0;
