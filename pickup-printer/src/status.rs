//! Hardware state codes reported by the print service

use std::fmt;

/// Printer hardware state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrinterState {
    Running,
    Initializing,
    HardwareFault,
    OutOfPaper,
    Overheating,
    CoverOpen,
    CutterFault,
    CutterRecovered,
    BlackMarkNotFound,
    NotFound,
    /// No answer, or a code this layer does not know
    InterfaceTooLow,
}

impl PrinterState {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => PrinterState::Running,
            2 => PrinterState::Initializing,
            3 => PrinterState::HardwareFault,
            4 => PrinterState::OutOfPaper,
            5 => PrinterState::Overheating,
            6 => PrinterState::CoverOpen,
            7 => PrinterState::CutterFault,
            8 => PrinterState::CutterRecovered,
            9 => PrinterState::BlackMarkNotFound,
            505 => PrinterState::NotFound,
            _ => PrinterState::InterfaceTooLow,
        }
    }

    /// Whether the printer can take a job right now
    pub fn is_ready(self) -> bool {
        self == PrinterState::Running
    }

    /// Human readable status text
    pub fn message(self) -> &'static str {
        match self {
            PrinterState::Running => "printer is running",
            PrinterState::Initializing => "printer found but still initializing",
            PrinterState::HardwareFault => {
                "printer hardware interface is abnormal and needs to be reprinted"
            }
            PrinterState::OutOfPaper => "printer is out of paper",
            PrinterState::Overheating => "printer is overheating",
            PrinterState::CoverOpen => "printer's cover is not closed",
            PrinterState::CutterFault => "printer's cutter is abnormal",
            PrinterState::CutterRecovered => "printer's cutter is normal",
            PrinterState::BlackMarkNotFound => "not found black mark paper",
            PrinterState::NotFound => "printer does not exist",
            PrinterState::InterfaceTooLow => "Interface is too low to implement interface",
        }
    }
}

impl From<Option<i32>> for PrinterState {
    fn from(code: Option<i32>) -> Self {
        code.map_or(PrinterState::InterfaceTooLow, PrinterState::from_code)
    }
}

impl fmt::Display for PrinterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
