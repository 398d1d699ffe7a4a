pub mod fs_artifact_sink;
