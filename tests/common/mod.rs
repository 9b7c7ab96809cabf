//! Shared fakes for the workflow integration tests: a scriptable camera
//! device, detector, location provider, and an in-memory record store.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};

use rollcall::{
    AttendanceRecord, AttendanceStats, BoundingBox, CameraDevice, CameraError, CameraStream,
    Detection, DetectionError, Detector, Frame, GeoFix, LocationError, LocationProvider,
    RecordStore, StoreError, StreamConstraints,
};

pub fn test_frame(seed: u8) -> Frame {
    Frame {
        bytes: vec![seed; 32],
        width: 4,
        height: 4,
    }
}

// ---------------------------------------------------------------------------
// Camera

#[derive(Default)]
pub struct CameraScript {
    pub open_errors: Mutex<VecDeque<CameraError>>,
    pub opens: AtomicUsize,
    pub streams_created: AtomicUsize,
    pub active_streams: AtomicUsize,
    pub frame_seed: AtomicUsize,
    pub serve_frames: AtomicBool,
}

pub struct FakeCamera {
    pub script: Arc<CameraScript>,
}

impl FakeCamera {
    pub fn new() -> (Self, Arc<CameraScript>) {
        let script = Arc::new(CameraScript {
            serve_frames: AtomicBool::new(true),
            frame_seed: AtomicUsize::new(1),
            ..CameraScript::default()
        });
        (
            Self {
                script: script.clone(),
            },
            script,
        )
    }

    pub fn failing(err: CameraError) -> (Self, Arc<CameraScript>) {
        let (camera, script) = Self::new();
        script.open_errors.lock().unwrap().push_back(err);
        (camera, script)
    }
}

struct FakeStream {
    script: Arc<CameraScript>,
    stopped: bool,
}

impl CameraStream for FakeStream {
    fn grab_frame(&mut self) -> Result<Option<Frame>, CameraError> {
        if !self.script.serve_frames.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let seed = self.script.frame_seed.load(Ordering::SeqCst) as u8;
        Ok(Some(test_frame(seed)))
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.script.active_streams.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl CameraDevice for FakeCamera {
    fn open(&self, _: &StreamConstraints) -> Result<Box<dyn CameraStream>, CameraError> {
        self.script.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.script.open_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.script.streams_created.fetch_add(1, Ordering::SeqCst);
        self.script.active_streams.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeStream {
            script: self.script.clone(),
            stopped: false,
        }))
    }
}

// ---------------------------------------------------------------------------
// Detector

pub struct FakeDetector {
    pub present: Arc<AtomicBool>,
}

impl FakeDetector {
    pub fn new(initially_present: bool) -> (Self, Arc<AtomicBool>) {
        let present = Arc::new(AtomicBool::new(initially_present));
        (
            Self {
                present: present.clone(),
            },
            present,
        )
    }
}

impl Detector for FakeDetector {
    fn detect(&self, _: &Frame) -> Result<Vec<Detection>, DetectionError> {
        if self.present.load(Ordering::SeqCst) {
            Ok(vec![Detection {
                label: "person".into(),
                confidence: 0.92,
                bounding_box: BoundingBox {
                    x: 1.0,
                    y: 1.0,
                    width: 2.0,
                    height: 2.0,
                },
            }])
        } else {
            Ok(Vec::new())
        }
    }
}

// ---------------------------------------------------------------------------
// Location

pub enum FakeLocation {
    Fix(GeoFix),
    Fails(LocationError),
    /// Blocks until the paired sender is dropped, then reports a timeout.
    /// Lets tests exercise "no fix ever arrives" deterministically.
    Pending(Mutex<mpsc::Receiver<()>>),
}

impl FakeLocation {
    pub fn pending() -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        (Self::Pending(Mutex::new(rx)), tx)
    }
}

impl LocationProvider for FakeLocation {
    fn current_position(&self, _high_accuracy: bool) -> Result<GeoFix, LocationError> {
        match self {
            FakeLocation::Fix(fix) => Ok(*fix),
            FakeLocation::Fails(err) => Err(err.clone()),
            FakeLocation::Pending(rx) => {
                let _ = rx.lock().unwrap().recv();
                Err(LocationError::Timeout)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Record store

#[derive(Clone, Default)]
pub struct MemoryStore {
    pub records: Arc<Mutex<Vec<AttendanceRecord>>>,
    pub appends: Arc<AtomicUsize>,
    pub fail_next: Arc<AtomicBool>,
    pub delay_ms: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn appended(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }
}

impl RecordStore for MemoryStore {
    async fn append(&self, record: &AttendanceRecord) -> Result<String, StoreError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay as u64)).await;
        }
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("simulated outage".into()));
        }
        self.appends.fetch_add(1, Ordering::SeqCst);
        let id = format!("rec-{}", self.appended());
        let mut stored = record.clone();
        stored.id = Some(id.clone());
        self.records.lock().unwrap().push(stored);
        Ok(id)
    }

    async fn records_for_subject(
        &self,
        subject_id: &str,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut records: Vec<_> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.subject_id == subject_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.captured_at.cmp(&a.captured_at));
        Ok(records)
    }

    async fn stats_for_subject(&self, _subject_id: &str) -> Result<AttendanceStats, StoreError> {
        Ok(AttendanceStats {
            total_days_marked: 0,
            attendance_percentage: 0.0,
            last_marked: None,
        })
    }
}
