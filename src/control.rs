// ABOUTME: Line protocol between the coordinator and its worker processes
// ABOUTME: Coordinator writes to worker stdin, worker answers on stdout, one message per line

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use thiserror::Error;

/// Coordinator -> worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Stop accepting, let sessions finish within the grace period
    Drain,
    /// Close every session now
    Shutdown,
    /// Liveness probe, answered with [`WorkerStatus::Pong`]
    Ping(u64),
}

/// Worker -> coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Ready { pid: u32, addr: SocketAddr },
    Pong { nonce: u64, active_sessions: usize },
    ShutdownAck { closed_sessions: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    #[error("empty control line")]
    Empty,

    #[error("unknown control message '{0}'")]
    UnknownMessage(String),

    #[error("'{message}' expects {expected} argument(s)")]
    Arity {
        message: &'static str,
        expected: usize,
    },

    #[error("invalid argument '{0}'")]
    InvalidArgument(String),

    #[error("control channel closed")]
    Closed,
}

impl fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlMessage::Drain => write!(f, "drain"),
            ControlMessage::Shutdown => write!(f, "shutdown"),
            ControlMessage::Ping(nonce) => write!(f, "ping {nonce}"),
        }
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerStatus::Ready { pid, addr } => write!(f, "ready {pid} {addr}"),
            WorkerStatus::Pong {
                nonce,
                active_sessions,
            } => write!(f, "pong {nonce} {active_sessions}"),
            WorkerStatus::ShutdownAck { closed_sessions } => {
                write!(f, "shutdown-ack {closed_sessions}")
            }
        }
    }
}

fn arg<T: FromStr>(value: &str) -> Result<T, ControlError> {
    value
        .parse()
        .map_err(|_| ControlError::InvalidArgument(value.to_string()))
}

fn split(line: &str) -> Result<(&str, Vec<&str>), ControlError> {
    let mut words = line.split_whitespace();
    let name = words.next().ok_or(ControlError::Empty)?;
    Ok((name, words.collect()))
}

impl FromStr for ControlMessage {
    type Err = ControlError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        match split(line)? {
            ("drain", args) if args.is_empty() => Ok(ControlMessage::Drain),
            ("shutdown", args) if args.is_empty() => Ok(ControlMessage::Shutdown),
            ("ping", args) => match args.as_slice() {
                [nonce] => Ok(ControlMessage::Ping(arg(nonce)?)),
                _ => Err(ControlError::Arity {
                    message: "ping",
                    expected: 1,
                }),
            },
            ("drain", _) => Err(ControlError::Arity {
                message: "drain",
                expected: 0,
            }),
            ("shutdown", _) => Err(ControlError::Arity {
                message: "shutdown",
                expected: 0,
            }),
            (other, _) => Err(ControlError::UnknownMessage(other.to_string())),
        }
    }
}

impl FromStr for WorkerStatus {
    type Err = ControlError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (name, args) = split(line)?;
        match (name, args.as_slice()) {
            ("ready", [pid, addr]) => Ok(WorkerStatus::Ready {
                pid: arg(pid)?,
                addr: arg(addr)?,
            }),
            ("pong", [nonce, active]) => Ok(WorkerStatus::Pong {
                nonce: arg(nonce)?,
                active_sessions: arg(active)?,
            }),
            ("shutdown-ack", [closed]) => Ok(WorkerStatus::ShutdownAck {
                closed_sessions: arg(closed)?,
            }),
            ("ready" | "pong", _) => Err(ControlError::Arity {
                message: if name == "ready" { "ready" } else { "pong" },
                expected: 2,
            }),
            ("shutdown-ack", _) => Err(ControlError::Arity {
                message: "shutdown-ack",
                expected: 1,
            }),
            (other, _) => Err(ControlError::UnknownMessage(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_messages_parse_from_lines() {
        assert_eq!("drain".parse(), Ok(ControlMessage::Drain));
        assert_eq!("shutdown\n".trim().parse(), Ok(ControlMessage::Shutdown));
        assert_eq!("ping 42".parse(), Ok(ControlMessage::Ping(42)));
        assert_eq!(ControlMessage::Ping(7).to_string(), "ping 7");
    }

    #[test]
    fn worker_status_lines() {
        let ready: WorkerStatus = "ready 1234 127.0.0.1:2775".parse().unwrap();
        assert_eq!(
            ready,
            WorkerStatus::Ready {
                pid: 1234,
                addr: "127.0.0.1:2775".parse().unwrap(),
            }
        );
        assert_eq!(ready.to_string(), "ready 1234 127.0.0.1:2775");

        assert_eq!(
            "pong 3 12".parse(),
            Ok(WorkerStatus::Pong {
                nonce: 3,
                active_sessions: 12
            })
        );
        assert_eq!(
            WorkerStatus::ShutdownAck { closed_sessions: 2 }.to_string(),
            "shutdown-ack 2"
        );
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert_eq!("".parse::<ControlMessage>(), Err(ControlError::Empty));
        assert_eq!(
            "reboot".parse::<ControlMessage>(),
            Err(ControlError::UnknownMessage("reboot".into()))
        );
        assert_eq!(
            "ping".parse::<ControlMessage>(),
            Err(ControlError::Arity {
                message: "ping",
                expected: 1
            })
        );
        assert_eq!(
            "ping soon".parse::<ControlMessage>(),
            Err(ControlError::InvalidArgument("soon".into()))
        );
        assert_eq!(
            "pong 1".parse::<WorkerStatus>(),
            Err(ControlError::Arity {
                message: "pong",
                expected: 2
            })
        );
    }
}
