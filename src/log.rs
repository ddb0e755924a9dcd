//! Simple logger. By default, it writes to the console only; listeners can be
//! attached to receive a copy of every message.

use parking_lot::Mutex;
use std::fmt::Display;
use std::sync::mpsc::Sender;
use std::sync::LazyLock;

static LOG: LazyLock<Mutex<Log>> = LazyLock::new(|| {
    Mutex::new(Log {
        verbosity: MessageKind::Information,
        listeners: Default::default(),
    })
});

/// A kind of message.
#[derive(Debug, Default, Copy, Clone, PartialOrd, PartialEq, Eq, Ord, Hash)]
#[repr(u32)]
pub enum MessageKind {
    /// Some useful information.
    #[default]
    Information = 0,
    /// A warning.
    Warning = 1,
    /// An error of some kind.
    Error = 2,
}

impl MessageKind {
    fn as_str(self) -> &'static str {
        match self {
            MessageKind::Information => "[INFO]: ",
            MessageKind::Warning => "[WARNING]: ",
            MessageKind::Error => "[ERROR]: ",
        }
    }
}

/// A message that could be sent by the logger to all listeners.
#[derive(Clone)]
pub struct LogMessage {
    /// Kind of the message: information, warning or error.
    pub kind: MessageKind,
    /// The source message without logger prefixes.
    pub content: String,
}

/// See module docs.
pub struct Log {
    verbosity: MessageKind,
    listeners: Vec<Sender<LogMessage>>,
}

impl Log {
    fn write_internal<S>(&mut self, kind: MessageKind, message: S)
    where
        S: AsRef<str>,
    {
        let msg = message.as_ref();
        if kind as u32 >= self.verbosity as u32 {
            println!("{}{}", kind.as_str(), msg);

            self.listeners.retain(|listener| {
                listener
                    .send(LogMessage {
                        kind,
                        content: msg.to_owned(),
                    })
                    .is_ok()
            });
        }
    }

    /// Writes a message of the given kind into the log.
    pub fn writeln<S>(kind: MessageKind, msg: S)
    where
        S: AsRef<str>,
    {
        LOG.lock().write_internal(kind, msg)
    }

    /// Logs a message with [`MessageKind::Information`].
    pub fn info<S>(msg: S)
    where
        S: AsRef<str>,
    {
        Self::writeln(MessageKind::Information, msg)
    }

    /// Logs a message with [`MessageKind::Warning`].
    pub fn warn<S>(msg: S)
    where
        S: AsRef<str>,
    {
        Self::writeln(MessageKind::Warning, msg)
    }

    /// Logs a message with [`MessageKind::Error`].
    pub fn err<S>(msg: S)
    where
        S: AsRef<str>,
    {
        Self::writeln(MessageKind::Error, msg)
    }

    /// Sets the lowest message kind that is written out; anything below is
    /// dropped.
    pub fn set_verbosity(kind: MessageKind) {
        LOG.lock().verbosity = kind;
    }

    /// Adds a listener that receives a copy of every logged message.
    pub fn add_listener(listener: Sender<LogMessage>) {
        LOG.lock().listeners.push(listener)
    }

    /// Allows you to verify that the result of a method call is Ok, or print the error in the log.
    pub fn verify<T, E>(result: Result<T, E>)
    where
        E: Display,
    {
        if let Err(error) = result {
            Self::writeln(MessageKind::Error, format!("Operation failed! Reason: {error}"));
        }
    }
}
