use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
    process::{Child, Command, Output, Stdio},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use spritepack_core::SourceImageId;
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("failed to launch packer {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Non-zero exit, `code` is `None` when the packer was killed by a signal
    #[error("packer exited with code {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },

    #[error("packer did not finish within {after:?}")]
    TimedOut { after: Duration },

    #[error("packer succeeded but {path} could not be read: {source}")]
    MissingOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("packer working files: {0}")]
    Io(#[from] io::Error),
}

/// Settings handed to the packer on its command line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackerConfig {
    pub max_size: (u32, u32),
    /// Pixel gap between packed frames
    pub padding: u32,
    pub trim: bool,
    /// Base name of the atlas image and manifest the packer writes
    pub output_name: String,
    pub list_file_name: String,
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            max_size: (1024, 1024),
            padding: 3,
            trim: true,
            output_name: "atlas".to_string(),
            list_file_name: "sprites.txt".to_string(),
        }
    }
}

impl PackerConfig {
    pub fn with_max_size(mut self, width: u32, height: u32) -> Self {
        self.max_size = (width, height);
        self
    }

    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    pub fn with_output_name<T: Into<String>>(mut self, output_name: T) -> Self {
        self.output_name = output_name.into();
        self
    }

    /// Arguments following the program (and any program args), the list file goes last
    pub fn command_args(&self) -> Vec<String> {
        let mut args = vec![
            "--padding".to_string(),
            self.padding.to_string(),
            "-f".to_string(),
            "jsonarray".to_string(),
        ];
        if self.trim {
            args.push("--trim".to_string());
        }
        args.extend([
            "--size".to_string(),
            format!("{}x{}", self.max_size.0, self.max_size.1),
            "--output".to_string(),
            self.output_name.clone(),
            self.list_file_name.clone(),
        ]);
        args
    }

    pub fn manifest_file_name(&self) -> String {
        format!("{}.json", self.output_name)
    }

    pub fn image_file_name(&self) -> String {
        format!("{}.png", self.output_name)
    }
}

#[derive(Clone, Debug)]
pub struct PackRequest {
    /// Deduplicated, absolute where the packer needs it
    pub images: Vec<SourceImageId>,
    pub config: PackerConfig,
}

impl PackRequest {
    /// The newline delimited list file contents
    pub fn image_list(&self) -> String {
        let mut list = String::new();
        for image in &self.images {
            list.push_str(image.as_str());
            list.push('\n');
        }
        list
    }
}

#[derive(Clone, Debug, Default)]
pub struct PackerOutput {
    pub manifest_json: Vec<u8>,
    pub atlas_image: Vec<u8>,
    /// Anything the packer wrote to its error stream on a successful run
    pub diagnostics: String,
}

/// Turns source images into one atlas image and its manifest
pub trait AtlasPacker {
    fn pack(&self, request: &PackRequest) -> Result<PackerOutput, ProcessError>;
}

/// Runs a packer executable in a scratch directory, blocking until it exits
///
/// Without a timeout a packer which never exits blocks the caller forever.
pub struct ExternalPacker {
    program: PathBuf,
    program_args: Vec<String>,
    timeout: Option<Duration>,
}

impl ExternalPacker {
    pub fn new<P: AsRef<Path>>(program: P) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            program_args: Vec::new(),
            timeout: None,
        }
    }

    /// Arguments placed before the packer's own, e.g. a script for an interpreter
    pub fn with_program_args<I, T>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.program_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn run(&self, work_dir: &Path, config: &PackerConfig) -> Result<Output, ProcessError> {
        let program = caller_relative(&self.program).map_err(|source| ProcessError::Launch {
            program: self.program.display().to_string(),
            source,
        })?;
        let mut command = Command::new(&program);
        command
            .args(&self.program_args)
            .args(config.command_args())
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        log::debug!("Running packer {command:?}");

        let child = command.spawn().map_err(|source| ProcessError::Launch {
            program: self.program.display().to_string(),
            source,
        })?;
        match self.timeout {
            Some(timeout) => wait_with_timeout(child, timeout),
            None => Ok(child.wait_with_output()?),
        }
    }
}

impl AtlasPacker for ExternalPacker {
    fn pack(&self, request: &PackRequest) -> Result<PackerOutput, ProcessError> {
        let config = &request.config;
        // Removed with everything the packer wrote when dropped
        let work_dir = tempfile::Builder::new().prefix("spritepack-").tempdir()?;
        fs::write(work_dir.path().join(&config.list_file_name), request.image_list())?;

        let output = self.run(work_dir.path(), config)?;
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(ProcessError::Exit {
                code: output.status.code(),
                stderr,
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            log::debug!("Packer output: {}", stdout.trim());
        }

        let read_output = |name: String| {
            let path = work_dir.path().join(name);
            fs::read(&path).map_err(|source| ProcessError::MissingOutput { path, source })
        };
        Ok(PackerOutput {
            manifest_json: read_output(config.manifest_file_name())?,
            atlas_image: read_output(config.image_file_name())?,
            diagnostics: stderr,
        })
    }
}

fn wait_with_timeout(mut child: Child, timeout: Duration) -> Result<Output, ProcessError> {
    // Drain both pipes while polling, a full pipe would stall the packer
    let stdout = child.stdout.take().map(read_in_background);
    let stderr = child.stderr.take().map(read_in_background);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(error) => {
                stop(&mut child);
                return Err(error.into());
            }
        }
        if Instant::now() >= deadline {
            stop(&mut child);
            return Err(ProcessError::TimedOut { after: timeout });
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(Output {
        status,
        stdout: join_reader(stdout),
        stderr: join_reader(stderr),
    })
}

/// Kill and reap a packer which is being abandoned
fn stop(child: &mut Child) {
    if let Err(error) = child.kill() {
        log::warn!("Failed to kill packer: {error}");
    }
    if let Err(error) = child.wait() {
        log::warn!("Failed to reap packer: {error}");
    }
}

/// A relative path with a directory part is resolved against the caller's working
/// directory, the packer runs in its scratch directory. Bare names go through PATH.
pub fn caller_relative(path: &Path) -> io::Result<PathBuf> {
    if path.is_relative() && path.components().count() > 1 {
        Ok(std::env::current_dir()?.join(path))
    } else {
        Ok(path.to_path_buf())
    }
}

fn read_in_background<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        if let Err(error) = reader.read_to_end(&mut bytes) {
            log::warn!("Failed reading packer output: {error}");
        }
        bytes
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}
