// Media conversion through external ffmpeg/ffprobe processes.
// - `options`/`args` describe what to run; `sequencer` decides when.
// - `process` holds the spawn/kill and filesystem seams.
pub mod args;
pub mod options;
pub mod probe;
pub mod process;
pub mod sequencer;

pub use options::{AudioBitrate, ConvertFormat, ConvertOptions, ConvertRequest, FrameSize, Rotation};
pub use probe::MediaMetadata;
pub use process::{StdFs, SystemLauncher};
pub use sequencer::{Sequencer, SequencerEvent, ToolPaths};
