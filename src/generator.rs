use std::fmt::{Display, Formatter};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::str::FromStr;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{BridgeError, BridgeResult};
use crate::matrix::Matrix;

const MATRIX_START: &str = "MATRIX_START";
const MATRIX_END: &str = "MATRIX_END";

/// How long a generator run may take before the child is killed.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(30);

// Error correction level
//------------------------------------------------------------------------------

/// Passed through to the external generator untouched; no error correction
/// happens in this crate.
#[derive(Debug, PartialEq, Eq, Copy, Clone, PartialOrd, Ord)]
pub enum EcLevel {
    L,
    M,
    Q,
    H,
}

impl EcLevel {
    /// Numeric form the generator library expects (1 = L .. 4 = H).
    pub fn as_arg(self) -> &'static str {
        match self {
            Self::L => "1",
            Self::M => "2",
            Self::Q => "3",
            Self::H => "4",
        }
    }
}

impl Display for EcLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::L => "L",
            Self::M => "M",
            Self::Q => "Q",
            Self::H => "H",
        };
        f.write_str(s)
    }
}

impl FromStr for EcLevel {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "L" | "l" => Ok(Self::L),
            "M" | "m" => Ok(Self::M),
            "Q" | "q" => Ok(Self::Q),
            "H" | "h" => Ok(Self::H),
            _ => Err(BridgeError::Validation(format!(
                "unknown error correction level {s:?}, expected L, M, Q or H"
            ))),
        }
    }
}

// Matrix generator
//------------------------------------------------------------------------------

/// Capability seam over whatever produces QR module matrices, so the
/// rasterizer and harness never see process invocation details.
pub trait MatrixGenerator {
    fn generate(&self, text: &str, ec: Option<EcLevel>) -> BridgeResult<Matrix>;
}

/// Generator backed by an external interpreter plus a QR encoding library,
/// such as `lua` with `qrencode.lua`.
///
/// Each call writes a uniquely-named transient driver script, runs the
/// interpreter against it and parses the matrix protocol off stdout. The
/// payload reaches the script through argv, never through the script
/// source, so encoded text cannot break out of the generated code. The
/// script is deleted on every exit path, parse failures included.
pub struct ProcessGenerator {
    program: PathBuf,
    library: PathBuf,
    timeout: Duration,
}

impl ProcessGenerator {
    pub fn new(program: impl Into<PathBuf>, library: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            library: library.into(),
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn driver_script(&self) -> String {
        format!(
            r#"local qrencode = dofile({lib})
local ok, matrix = qrencode.qrcode(arg[1], tonumber(arg[2]))
if not ok then
    io.stderr:write(tostring(matrix) .. "\n")
    os.exit(1)
end
print("{start}")
print(#matrix)
for y = 1, #matrix do
    local row = {{}}
    for x = 1, #matrix do
        row[x] = matrix[x][y]
    end
    print(table.concat(row, " "))
end
print("{end_}")
"#,
            lib = lua_quote(&self.library.to_string_lossy()),
            start = MATRIX_START,
            end_ = MATRIX_END,
        )
    }
}

impl MatrixGenerator for ProcessGenerator {
    fn generate(&self, text: &str, ec: Option<EcLevel>) -> BridgeResult<Matrix> {
        let mut script = tempfile::Builder::new()
            .prefix("qrbridge-gen-")
            .suffix(".lua")
            .tempfile()?;
        script.write_all(self.driver_script().as_bytes())?;
        script.flush()?;

        let mut cmd = Command::new(&self.program);
        cmd.arg(script.path()).arg(text);
        if let Some(ec) = ec {
            cmd.arg(ec.as_arg());
        }

        debug!(program = %self.program.display(), "running external generator");
        let output = run_with_timeout(cmd, self.timeout)?;

        if !output.status.success() {
            return Err(BridgeError::Generation(format!(
                "generator exited with {}: {}",
                output.status,
                output.stderr.trim()
            )));
        }

        let rows = parse_matrix_output(&output.stdout)?;
        Matrix::from_rows(rows)
    }
}

// Subprocess plumbing
//------------------------------------------------------------------------------

struct CapturedOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

fn run_with_timeout(mut cmd: Command, timeout: Duration) -> BridgeResult<CapturedOutput> {
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| {
        BridgeError::Generation(format!("could not start generator {:?}: {e}", cmd.get_program()))
    })?;

    // Drained off-thread so a chatty generator cannot fill a pipe and
    // deadlock against the wait loop below.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(BridgeError::Generation(format!(
                "generator did not finish within {timeout:?}"
            )));
        }
        thread::sleep(Duration::from_millis(10));
    };

    Ok(CapturedOutput {
        status,
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    })
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    })
}

fn lua_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

// Output protocol
//------------------------------------------------------------------------------

/// Strict parse of the generator's stdout protocol: a `MATRIX_START` line,
/// a line holding the size N, exactly N lines of N whitespace-separated
/// integers, a `MATRIX_END` line. Anything before `MATRIX_START` is
/// generator chatter and ignored; every deviation after it is an error.
pub(crate) fn parse_matrix_output(out: &str) -> BridgeResult<Vec<Vec<i32>>> {
    let mut lines = out.lines().map(|l| l.trim_end_matches('\r'));

    if !lines.any(|l| l == MATRIX_START) {
        return Err(protocol_err("missing MATRIX_START sentinel"));
    }

    let size: usize = lines
        .next()
        .ok_or_else(|| protocol_err("output ends after MATRIX_START"))?
        .trim()
        .parse()
        .map_err(|_| protocol_err("matrix size line is not an integer"))?;
    if size == 0 {
        return Err(protocol_err("declared matrix size is zero"));
    }

    let mut rows = Vec::with_capacity(size);
    for r in 0..size {
        let line = lines
            .next()
            .ok_or_else(|| protocol_err(format!("output ends after {r} of {size} rows")))?;
        if line == MATRIX_END {
            return Err(protocol_err(format!("MATRIX_END after {r} of {size} rows")));
        }

        let row = line
            .split_whitespace()
            .map(|tok| {
                tok.parse::<i32>()
                    .map_err(|_| protocol_err(format!("row {r} holds non-integer token {tok:?}")))
            })
            .collect::<BridgeResult<Vec<i32>>>()?;
        if row.len() != size {
            return Err(protocol_err(format!(
                "row {r} has {} values, expected {size}",
                row.len()
            )));
        }
        rows.push(row);
    }

    match lines.next() {
        Some(l) if l == MATRIX_END => Ok(rows),
        _ => Err(protocol_err("missing MATRIX_END sentinel")),
    }
}

fn protocol_err(msg: impl Into<String>) -> BridgeError {
    BridgeError::Generation(format!("generator output: {}", msg.into()))
}
