//! Motion sensor access for head orientation
//!
//! Access is requested once, from the activation gesture. On Android the NDK
//! Game Rotation Vector sensor (gyroscope as fallback) is opened through
//! ndk-sys; it needs no runtime permission. Platforms without a sensor API
//! report `Unavailable` and the head pose stays at identity.

use glam::Quat;
use log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    NotRequested,
    Granted,
    /// No sensor API, no suitable sensor, or access refused
    Unavailable,
}

/// Head orientation source
pub struct MotionSensors {
    permission: PermissionState,
    orientation: Quat,
    #[cfg(target_os = "android")]
    queue: Option<ndk::SensorQueue>,
}

impl Default for MotionSensors {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionSensors {
    pub fn new() -> Self {
        Self {
            permission: PermissionState::NotRequested,
            orientation: Quat::IDENTITY,
            #[cfg(target_os = "android")]
            queue: None,
        }
    }

    pub fn permission(&self) -> PermissionState {
        self.permission
    }

    /// Ask for sensor access. Only the first call does anything; failure is
    /// silent apart from a log line.
    pub fn request_permission(&mut self) -> PermissionState {
        if self.permission != PermissionState::NotRequested {
            return self.permission;
        }
        self.permission = if self.open_platform_sensors() {
            info!("Motion sensors available for head tracking");
            PermissionState::Granted
        } else {
            info!("No motion sensors - using fixed orientation");
            PermissionState::Unavailable
        };
        self.permission
    }

    #[cfg(target_os = "android")]
    fn open_platform_sensors(&mut self) -> bool {
        self.queue = ndk::SensorQueue::open();
        self.queue.is_some()
    }

    #[cfg(not(target_os = "android"))]
    fn open_platform_sensors(&mut self) -> bool {
        false
    }

    /// Drain pending sensor events
    pub fn update(&mut self, dt: f32) {
        if let Some(orientation) = self.poll_platform_sensors(dt) {
            self.orientation = orientation;
        }
    }

    #[cfg(target_os = "android")]
    fn poll_platform_sensors(&mut self, dt: f32) -> Option<Quat> {
        self.queue.as_mut().and_then(|queue| queue.poll(dt))
    }

    #[cfg(not(target_os = "android"))]
    fn poll_platform_sensors(&mut self, _dt: f32) -> Option<Quat> {
        None
    }

    /// Latest head orientation, identity until access is granted
    pub fn orientation(&self) -> Quat {
        self.orientation
    }
}

#[cfg(target_os = "android")]
mod ndk {
    use glam::Quat;
    use log::info;
    use std::ptr;

    const ASENSOR_TYPE_GAME_ROTATION_VECTOR: i32 = 15;
    const ASENSOR_TYPE_GYROSCOPE: i32 = 4;
    // ~60Hz
    const EVENT_RATE_US: i32 = 16_000;

    /// NDK sensor event queue bound to the calling thread's looper
    pub struct SensorQueue {
        manager: *mut ndk_sys::ASensorManager,
        queue: *mut ndk_sys::ASensorEventQueue,
        pitch: f32,
        yaw: f32,
        roll: f32,
    }

    impl SensorQueue {
        pub fn open() -> Option<Self> {
            info!("Initializing rotation sensors...");
            unsafe {
                let mut manager = ndk_sys::ASensorManager_getInstanceForPackage(b"com.stereovideo.core\0".as_ptr().cast());
                if manager.is_null() {
                    // Deprecated, but present on older API levels
                    manager = ndk_sys::ASensorManager_getInstance();
                }
                if manager.is_null() {
                    info!("ASensorManager not available");
                    return None;
                }

                let mut sensor = ndk_sys::ASensorManager_getDefaultSensor(manager, ASENSOR_TYPE_GAME_ROTATION_VECTOR);
                if sensor.is_null() {
                    info!("Game Rotation Vector not available, trying gyroscope");
                    sensor = ndk_sys::ASensorManager_getDefaultSensor(manager, ASENSOR_TYPE_GYROSCOPE);
                }
                if sensor.is_null() {
                    info!("No rotation sensors available");
                    return None;
                }

                let mut looper = ndk_sys::ALooper_forThread();
                if looper.is_null() {
                    looper = ndk_sys::ALooper_prepare(0);
                }
                if looper.is_null() {
                    info!("Failed to get ALooper");
                    return None;
                }

                let queue = ndk_sys::ASensorManager_createEventQueue(manager, looper, 0, None, ptr::null_mut());
                if queue.is_null() {
                    info!("Failed to create sensor event queue");
                    return None;
                }

                let result = ndk_sys::ASensorEventQueue_enableSensor(queue, sensor);
                if result < 0 {
                    info!("Failed to enable sensor: {}", result);
                    ndk_sys::ASensorManager_destroyEventQueue(manager, queue);
                    return None;
                }
                ndk_sys::ASensorEventQueue_setEventRate(queue, sensor, EVENT_RATE_US);

                Some(Self {
                    manager,
                    queue,
                    pitch: 0.0,
                    yaw: 0.0,
                    roll: 0.0,
                })
            }
        }

        /// Orientation after draining all pending events, if any arrived
        pub fn poll(&mut self, dt: f32) -> Option<Quat> {
            let mut latest = None;
            unsafe {
                let mut event: ndk_sys::ASensorEvent = std::mem::zeroed();
                while ndk_sys::ASensorEventQueue_getEvents(self.queue, &mut event, 1) > 0 {
                    let data = event.__bindgen_anon_1.__bindgen_anon_1.data;
                    match event.type_ {
                        ASENSOR_TYPE_GAME_ROTATION_VECTOR => {
                            let (x, y, z) = (data[0], data[1], data[2]);
                            // w from the unit quaternion constraint
                            let w = (1.0 - x * x - y * y - z * z).max(0.0).sqrt();
                            latest = Some(Quat::from_xyzw(x, y, z, w).normalize());
                        }
                        ASENSOR_TYPE_GYROSCOPE => {
                            // Angular rate in rad/s, integrated per frame
                            self.pitch += data[0] * dt;
                            self.yaw += data[2] * dt;
                            self.roll += data[1] * dt;
                            latest = Some(Quat::from_euler(glam::EulerRot::YXZ, self.yaw, self.pitch, self.roll));
                        }
                        _ => {}
                    }
                }
            }
            latest
        }
    }

    impl Drop for SensorQueue {
        fn drop(&mut self) {
            unsafe {
                ndk_sys::ASensorManager_destroyEventQueue(self.manager, self.queue);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_before_permission() {
        let mut sensors = MotionSensors::new();
        assert_eq!(sensors.permission(), PermissionState::NotRequested);
        sensors.update(0.016);
        assert_eq!(sensors.orientation(), Quat::IDENTITY);
    }

    #[cfg(not(target_os = "android"))]
    #[test]
    fn missing_sensor_api_is_a_silent_no_op() {
        let mut sensors = MotionSensors::new();
        assert_eq!(sensors.request_permission(), PermissionState::Unavailable);
        assert_eq!(sensors.request_permission(), PermissionState::Unavailable);
        sensors.update(0.016);
        assert_eq!(sensors.orientation(), Quat::IDENTITY);
    }
}
