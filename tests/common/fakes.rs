#![allow(dead_code)] // Each test binary uses a different subset

use screenrec::engine::core::{MonitorInfo, RawRect, ScreenSize};
use screenrec::engine::geometry::{GeometryChain, GeometryProvider};
use screenrec::engine::region::{RegionError, RegionPicker};
use screenrec::engine::session::{ChildProcess, Launcher};
use screenrec::engine::signals::SignalIsolation;
use std::cell::RefCell;
use std::fs::File;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use std::rc::Rc;

/// Geometry provider returning canned values
pub struct FixedGeometry {
    pub screen: Option<ScreenSize>,
    pub monitor: Option<MonitorInfo>,
}

impl GeometryProvider for FixedGeometry {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn screen_size(&self) -> Option<ScreenSize> {
        self.screen
    }

    fn primary_monitor(&self) -> Option<MonitorInfo> {
        self.monitor.clone()
    }
}

pub fn monitor(x: u32, y: u32, w: u32, h: u32) -> MonitorInfo {
    MonitorInfo {
        x,
        y,
        w,
        h,
        name: "DP-1".to_string(),
    }
}

/// Chain with one provider that knows the screen and the primary monitor
pub fn geometry(screen: (u32, u32), primary: MonitorInfo) -> GeometryChain {
    GeometryChain::new(vec![Box::new(FixedGeometry {
        screen: Some(ScreenSize {
            w: screen.0,
            h: screen.1,
        }),
        monitor: Some(primary),
    })])
}

/// Chain where every provider fails
pub fn no_geometry() -> GeometryChain {
    GeometryChain::new(vec![Box::new(FixedGeometry {
        screen: None,
        monitor: None,
    })])
}

/// Picker returning canned selections
pub struct FakePicker {
    pub selection: Result<Option<RawRect>, RegionError>,
    pub window: Result<RawRect, RegionError>,
}

impl FakePicker {
    pub fn selecting(rect: RawRect) -> Self {
        Self {
            selection: Ok(Some(rect)),
            window: Err(RegionError::GeometryUnavailable),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            selection: Ok(None),
            window: Err(RegionError::GeometryUnavailable),
        }
    }

    pub fn clicking(rect: RawRect) -> Self {
        Self {
            selection: Ok(None),
            window: Ok(rect),
        }
    }
}

impl RegionPicker for FakePicker {
    fn select_region(&self) -> Result<Option<RawRect>, RegionError> {
        self.selection.clone()
    }

    fn pick_window(&self) -> Result<RawRect, RegionError> {
        self.window.clone()
    }
}

/// Shared record of everything the fakes observed, in order
pub type Events = Rc<RefCell<Vec<String>>>;

pub fn events() -> Events {
    Rc::new(RefCell::new(Vec::new()))
}

/// How a fake encoder behaves once launched
#[derive(Debug, Clone, Copy)]
pub struct ChildScript {
    /// Exit on its own when waited on
    pub exits_naturally: bool,
    /// Stop when it receives SIGINT
    pub honors_interrupt: bool,
    /// Make wait() fail (lost child)
    pub wait_fails: bool,
    /// Bytes written to the output file when the child finishes
    pub output_bytes: Option<usize>,
}

impl Default for ChildScript {
    fn default() -> Self {
        Self {
            exits_naturally: true,
            honors_interrupt: true,
            wait_fails: false,
            output_bytes: Some(64 * 1024),
        }
    }
}

pub struct FakeChild {
    pub pid: u32,
    pub script: ChildScript,
    pub alive: bool,
    pub output_path: Option<PathBuf>,
    pub events: Events,
}

impl FakeChild {
    pub fn new(pid: u32, script: ChildScript, events: Events) -> Self {
        Self {
            pid,
            script,
            alive: true,
            output_path: None,
            events,
        }
    }

    fn finish(&mut self) {
        self.alive = false;
        if let (Some(path), Some(bytes)) = (&self.output_path, self.script.output_bytes) {
            std::fs::write(path, vec![0u8; bytes]).unwrap();
        }
    }
}

impl ChildProcess for FakeChild {
    fn id(&self) -> u32 {
        self.pid
    }

    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        if self.alive {
            Ok(None)
        } else {
            Ok(Some(ExitStatus::from_raw(0)))
        }
    }

    fn wait(&mut self) -> io::Result<ExitStatus> {
        self.events.borrow_mut().push("wait".to_string());
        if self.script.wait_fails {
            return Err(io::Error::other("ECHILD"));
        }
        if self.alive && self.script.exits_naturally {
            self.finish();
        }
        Ok(ExitStatus::from_raw(0))
    }

    fn interrupt(&mut self) -> io::Result<()> {
        self.events.borrow_mut().push("interrupt".to_string());
        if self.script.honors_interrupt {
            self.finish();
        }
        Ok(())
    }

    fn kill(&mut self) -> io::Result<()> {
        self.events.borrow_mut().push("kill".to_string());
        self.alive = false;
        Ok(())
    }
}

/// Launcher producing scripted fake children
pub struct FakeLauncher {
    pub script: ChildScript,
    pub output_path: Option<PathBuf>,
    pub fail: bool,
    pub events: Events,
    pub last_args: RefCell<Vec<String>>,
}

impl FakeLauncher {
    pub fn new(script: ChildScript, output_path: PathBuf, events: Events) -> Self {
        Self {
            script,
            output_path: Some(output_path),
            fail: false,
            events,
            last_args: RefCell::new(Vec::new()),
        }
    }
}

impl Launcher for FakeLauncher {
    fn spawn(&self, cmd: Command, _log: File) -> io::Result<Box<dyn ChildProcess>> {
        self.events.borrow_mut().push("spawn".to_string());
        *self.last_args.borrow_mut() = cmd
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::NotFound, "ffmpeg not found"));
        }
        let mut child = FakeChild::new(4242, self.script, self.events.clone());
        child.output_path = self.output_path.clone();
        Ok(Box::new(child))
    }
}

/// Isolation that only records calls
pub struct RecordingIsolation {
    pub events: Events,
}

impl SignalIsolation for RecordingIsolation {
    fn install(&self) -> io::Result<()> {
        self.events.borrow_mut().push("install".to_string());
        Ok(())
    }

    fn attach(&self, child_pid: u32) {
        self.events
            .borrow_mut()
            .push(format!("attach {}", child_pid));
    }

    fn restore(&self) {
        self.events.borrow_mut().push("restore".to_string());
    }
}
