#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error(
        "container runtime '{program}' not found; install Docker: https://docs.docker.com/get-docker/"
    )]
    NotFound {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} command failed: {args:?}\n{stderr}")]
    CommandFailed {
        program: String,
        args: Vec<String>,
        stderr: String,
    },

    #[error("container runtime output was not valid UTF-8")]
    InvalidUtf8 { source: std::string::FromUtf8Error },
}
