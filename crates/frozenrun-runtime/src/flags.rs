//! Command-line flag parser
//!
//! Getopt-style parsing of the interpreter flags. Flags are applied to the
//! [`BootstrapContext`] as they are read. `-c` and `-m` take the next value
//! as their payload and end option parsing: everything after belongs to the
//! target. Level flags (`-v`, `-d`, `-O`) set their level to the number of
//! occurrences on this command line.

use crate::context::{BootstrapContext, WarningFilter};
use crate::error::BootstrapError;

/// Flags that take a value, either attached (`-Wignore`) or as the next
/// argument (`-W ignore`).
const VALUE_FLAGS: &[char] = &['W', 'X', 'c', 'm'];

/// Payload of `-c` / `-m`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// `-c <code>`
    InlineString(String),
    /// `-m <module>`
    Module(String),
}

/// A parsed command line that should run something.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCommandLine {
    /// Arguments after the options
    pub positional: Vec<String>,

    /// Set when `-c` or `-m` ended option parsing
    pub payload: Option<Payload>,

    /// Non-fatal diagnostics to print before running
    pub warnings: Vec<String>,
}

/// What the command line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Run(ParsedCommandLine),
    Help,
    Version,
}

#[derive(Default)]
struct Counts {
    verbose: u8,
    debug: u8,
    optimize: u8,
}

fn bump(count: &mut u8) -> u8 {
    *count = count.saturating_add(1);
    *count
}

/// Parse `args` (without the program name), updating `ctx.flags` and
/// `ctx.warnings` as flags are seen.
pub fn parse_command_line(
    args: &[String],
    ctx: &mut BootstrapContext,
) -> Result<ParseOutcome, BootstrapError> {
    let mut counts = Counts::default();
    let mut parsed = ParsedCommandLine::default();
    let mut index = 0;

    while index < args.len() {
        let arg = &args[index];
        if arg == "--" {
            index += 1;
            break;
        }
        if arg == "-" || !arg.starts_with('-') {
            break;
        }
        if arg.starts_with("--") {
            return Err(BootstrapError::Usage(format!("Unknown option {}", arg)));
        }

        let cluster = &arg[1..];
        for (pos, flag) in cluster.char_indices() {
            if VALUE_FLAGS.contains(&flag) {
                let attached = &cluster[pos + flag.len_utf8()..];
                let value = if !attached.is_empty() {
                    attached.to_string()
                } else {
                    index += 1;
                    args.get(index).cloned().ok_or_else(|| {
                        BootstrapError::Usage(format!("Missing argument for -{}", flag))
                    })?
                };

                match flag {
                    'c' | 'm' => {
                        parsed.payload = Some(if flag == 'c' {
                            Payload::InlineString(value)
                        } else {
                            Payload::Module(value)
                        });
                        parsed.positional = args[index + 1..].to_vec();
                        return Ok(ParseOutcome::Run(parsed));
                    }
                    'W' => match WarningFilter::parse(&value) {
                        Ok(filter) => ctx.warnings.add(filter),
                        Err(reason) => parsed
                            .warnings
                            .push(format!("Invalid -W option ignored: {}", reason)),
                    },
                    _ => {
                        if ctx.flags.debug > 0 {
                            parsed.warnings.push(format!(
                                "Command line option -X {} is not supported. Ignoring the option.",
                                value
                            ));
                        }
                    }
                }
                break;
            }

            let flags = &mut ctx.flags;
            match flag {
                'v' => flags.verbose = bump(&mut counts.verbose),
                'd' => flags.debug = bump(&mut counts.debug),
                'O' => flags.optimize = bump(&mut counts.optimize),
                'b' => flags.bytecode = true,
                'i' => flags.inspect = true,
                'u' => flags.unbuffered = true,
                'E' => flags.ignore_environment = true,
                's' => flags.skip_user_site = true,
                'S' => {
                    flags.ignore_pth_files = true;
                    flags.skip_site_main = true;
                }
                'I' => {
                    flags.ignore_environment = true;
                    flags.skip_user_site = true;
                }
                'P' => flags.safe_path = true,
                'B' => flags.dont_write_bytecode = true,
                '3' => {}
                'h' | '?' => return Ok(ParseOutcome::Help),
                'V' => return Ok(ParseOutcome::Version),
                'R' => {
                    return Err(BootstrapError::UnsupportedFeature(
                        "Hash randomization (-R) is not supported".to_string(),
                    ))
                }
                other => {
                    return Err(BootstrapError::Usage(format!("Unknown option -{}", other)));
                }
            }
        }
        index += 1;
    }

    parsed.positional = args[index.min(args.len())..].to_vec();
    Ok(ParseOutcome::Run(parsed))
}
