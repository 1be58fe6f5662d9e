// Copyright (c) 2019-present Dmitry Stepanov and Fyrox Engine contributors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Simple logger. By default, it writes in the console only (stdout on desktop, `console.log`
//! in the browser). To duplicate the output into a file, call [`Log::set_file_name`] somewhere
//! in your `main` function.

use crate::{instant::Instant, parking_lot::Mutex};
#[cfg(target_arch = "wasm32")]
use crate::wasm_bindgen::{self, prelude::*};
use std::{
    fmt::{Debug, Display},
    path::Path,
    sync::{mpsc::Sender, LazyLock},
    time::Duration,
};
#[cfg(not(target_arch = "wasm32"))]
use std::io::{self, Write};

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

/// A message that is sent by the logger to all listeners.
#[derive(Debug, Clone)]
pub struct LogMessage {
    /// Kind of the message: information, warning or error.
    pub kind: MessageKind,
    /// The source message without logger prefixes.
    pub content: String,
    /// Time point at which the message was recorded, relative to the moment when the logger
    /// was initialized.
    pub time: Duration,
}

static LOG: LazyLock<Mutex<Log>> = LazyLock::new(|| {
    Mutex::new(Log {
        #[cfg(not(target_arch = "wasm32"))]
        file: None,
        verbosity: MessageKind::Information,
        listeners: Default::default(),
        time_origin: Instant::now(),
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
    fn prefix(self) -> &'static str {
        match self {
            MessageKind::Information => "[INFO]: ",
            MessageKind::Warning => "[WARNING]: ",
            MessageKind::Error => "[ERROR]: ",
        }
    }
}

/// See module docs.
pub struct Log {
    #[cfg(not(target_arch = "wasm32"))]
    file: Option<std::fs::File>,
    verbosity: MessageKind,
    listeners: Vec<Sender<LogMessage>>,
    time_origin: Instant,
}

impl Log {
    /// Creates a new log file at the specified path. Does nothing in the browser.
    pub fn set_file_name<P: AsRef<Path>>(#[allow(unused_variables)] path: P) {
        #[cfg(not(target_arch = "wasm32"))]
        {
            LOG.lock().file = std::fs::File::create(path).ok();
        }
    }

    fn write_internal(&mut self, kind: MessageKind, content: String) {
        if kind < self.verbosity {
            return;
        }

        // Disconnected listeners are dropped here.
        let time = Instant::now() - self.time_origin;
        self.listeners.retain(|listener| {
            listener
                .send(LogMessage {
                    kind,
                    content: content.clone(),
                    time,
                })
                .is_ok()
        });

        let mut line = String::with_capacity(content.len() + 16);
        line.push_str(kind.prefix());
        line.push_str(&content);

        #[cfg(target_arch = "wasm32")]
        {
            log(&line);
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            line.push('\n');

            let _ = io::stdout().write_all(line.as_bytes());

            if let Some(file) = self.file.as_mut() {
                let _ = file.write_all(line.as_bytes());
                let _ = file.flush();
            }
        }
    }

    /// Writes a line to the console and optionally into the file (if set).
    pub fn writeln<S>(kind: MessageKind, msg: S)
    where
        S: AsRef<str>,
    {
        LOG.lock().write_internal(kind, msg.as_ref().to_owned());
    }

    /// Writes an information message.
    pub fn info<S>(msg: S)
    where
        S: AsRef<str>,
    {
        Self::writeln(MessageKind::Information, msg)
    }

    /// Writes a warning message.
    pub fn warn<S>(msg: S)
    where
        S: AsRef<str>,
    {
        Self::writeln(MessageKind::Warning, msg)
    }

    /// Writes an error message.
    pub fn err<S>(msg: S)
    where
        S: AsRef<str>,
    {
        Self::writeln(MessageKind::Error, msg)
    }

    /// Sets verbosity level. Messages of lower kind are discarded.
    pub fn set_verbosity(kind: MessageKind) {
        LOG.lock().verbosity = kind;
    }

    /// Adds a listener that will receive a copy of every message passed into the log.
    pub fn add_listener(listener: Sender<LogMessage>) {
        LOG.lock().listeners.push(listener)
    }

    /// Prints the error into the log if the result is `Err`. Use it when an error _can_ be
    /// ignored, but should still be visible.
    pub fn verify<T, E>(result: Result<T, E>)
    where
        E: Debug,
    {
        if let Err(e) = result {
            Self::err(format!("Operation failed! Reason: {e:?}"));
        }
    }

    /// Same as [`Self::verify`], but prefixes the reason with the given message.
    pub fn verify_message<S, T, E>(result: Result<T, E>, msg: S)
    where
        E: Debug,
        S: Display,
    {
        if let Err(e) = result {
            Self::err(format!("{msg}. Reason: {e:?}"));
        }
    }
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::log::Log::info(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::log::Log::warn(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        $crate::log::Log::err(format!($($arg)*))
    };
}

#[cfg(test)]
mod test {
    use super::{Log, MessageKind};
    use std::sync::mpsc::channel;

    #[test]
    fn listener_receives_messages_without_prefix() {
        let (sender, receiver) = channel();
        Log::add_listener(sender);

        Log::warn("listener_receives_messages_without_prefix");

        let message = receiver
            .try_iter()
            .find(|m| m.content == "listener_receives_messages_without_prefix")
            .expect("message must be delivered");
        assert_eq!(message.kind, MessageKind::Warning);
    }

    #[test]
    fn verify_logs_only_errors() {
        let (sender, receiver) = channel();
        Log::add_listener(sender);

        Log::verify::<(), &str>(Ok(()));
        Log::verify::<(), &str>(Err("verify_logs_only_errors"));

        let errors = receiver
            .try_iter()
            .filter(|m| m.content.contains("verify_logs_only_errors"))
            .collect::<Vec<_>>();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, MessageKind::Error);
    }
}
