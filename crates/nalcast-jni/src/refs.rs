//! Java object references held by a session.

use std::time::Duration;

use bytes::Bytes;
use jni::objects::{GlobalRef, JByteArray, JMethodID, JObject, JValueOwned};
use jni::signature::ReturnType;
use jni::sys::{jlong, jvalue};
use jni::JNIEnv;
use nalcast_source::{HostHandle, NalQueue, ParamSetSource, PayloadError, QueueError};
use tracing::{debug, warn};

use crate::error::{Result, SetupError};

const POLL_SIG: &str = "(JLjava/util/concurrent/TimeUnit;)Ljava/lang/Object;";
const TIME_UNIT_CLASS: &str = "java/util/concurrent/TimeUnit";
const TIME_UNIT_SIG: &str = "Ljava/util/concurrent/TimeUnit;";
const BYTE_ARRAY_CLASS: &str = "[B";

/// A JNI global reference, deleted on release.
#[derive(Debug)]
pub struct JavaRef(pub GlobalRef);

impl HostHandle for JavaRef {
    fn release(self) {
        // GlobalRef attaches to the VM as needed to delete itself.
        drop(self.0);
    }
}

/// Print and clear a pending Java exception, if any.
pub(crate) fn clear_exception(env: &mut JNIEnv<'_>) {
    if env.exception_check().unwrap_or(false) {
        let _ = env.exception_describe();
        let _ = env.exception_clear();
    }
}

fn setup_step<T>(
    env: &mut JNIEnv<'_>,
    step: &'static str,
    result: jni::errors::Result<T>,
) -> Result<T> {
    result.map_err(|source| {
        clear_exception(env);
        SetupError::Jni { step, source }
    })
}

fn runtime_error(env: &mut JNIEnv<'_>, step: &str, err: jni::errors::Error) -> QueueError {
    clear_exception(env);
    QueueError::Runtime(format!("{step}: {err}"))
}

pub(crate) fn timeout_millis(timeout: Duration) -> jlong {
    jlong::try_from(timeout.as_millis()).unwrap_or(jlong::MAX)
}

/// A `java.util.concurrent.BlockingQueue<byte[]>` polled with a timeout.
#[derive(Debug)]
pub struct JavaQueue {
    queue: JavaRef,
    millis: JavaRef,
    poll: JMethodID,
}

impl JavaQueue {
    /// Take global references to `queue` and `TimeUnit.MILLISECONDS` and
    /// resolve `poll(long, TimeUnit)`. References taken before a failing
    /// step are released on return.
    pub fn new(env: &mut JNIEnv<'_>, queue: &JObject<'_>) -> Result<Self> {
        if queue.is_null() {
            return Err(SetupError::NullArgument("queue"));
        }

        let r = env.new_global_ref(queue);
        let queue = JavaRef(setup_step(env, "NewGlobalRef(queue)", r)?);

        let r = env.find_class(TIME_UNIT_CLASS);
        let unit_class = setup_step(env, "FindClass(TimeUnit)", r)?;
        let r = env
            .get_static_field(&unit_class, "MILLISECONDS", TIME_UNIT_SIG)
            .and_then(JValueOwned::l);
        let local_millis = setup_step(env, "GetStaticObjectField(MILLISECONDS)", r)?;
        let r = env.new_global_ref(&local_millis);
        let millis = JavaRef(setup_step(env, "NewGlobalRef(MILLISECONDS)", r)?);
        let _ = env.delete_local_ref(local_millis);
        let _ = env.delete_local_ref(unit_class);

        let r = env.get_object_class(queue.0.as_obj());
        let queue_class = setup_step(env, "GetObjectClass(queue)", r)?;
        let r = env.get_method_id(&queue_class, "poll", POLL_SIG);
        let poll = setup_step(env, "GetMethodID(poll)", r)?;
        let _ = env.delete_local_ref(queue_class);

        debug!("Resolved NAL queue poll method");
        Ok(Self {
            queue,
            millis,
            poll,
        })
    }

    fn copy_item(
        &self,
        env: &mut JNIEnv<'static>,
        array: &JByteArray<'static>,
    ) -> std::result::Result<Bytes, QueueError> {
        let is_bytes = env
            .is_instance_of(array, BYTE_ARRAY_CLASS)
            .map_err(|e| runtime_error(env, "IsInstanceOf", e))?;
        if !is_bytes {
            return Err(QueueError::Runtime(
                "queue element is not a byte[]".to_string(),
            ));
        }
        let data = env
            .convert_byte_array(array)
            .map_err(|e| runtime_error(env, "GetByteArrayRegion", e))?;
        Ok(Bytes::from(data))
    }
}

impl HostHandle for JavaQueue {
    fn release(self) {
        self.queue.release();
        self.millis.release();
    }
}

impl NalQueue<JNIEnv<'static>> for JavaQueue {
    fn poll(
        &self,
        env: &mut JNIEnv<'static>,
        timeout: Duration,
    ) -> std::result::Result<Option<Bytes>, QueueError> {
        let args = [
            jvalue {
                j: timeout_millis(timeout),
            },
            jvalue {
                l: self.millis.0.as_obj().as_raw(),
            },
        ];

        // SAFETY: `poll` was resolved on this object's class with POLL_SIG,
        // and `args` matches that signature.
        let result = unsafe {
            env.call_method_unchecked(self.queue.0.as_obj(), self.poll, ReturnType::Object, &args)
        };
        let obj = result
            .and_then(JValueOwned::l)
            .map_err(|e| runtime_error(env, "BlockingQueue.poll", e))?;

        if obj.is_null() {
            return Ok(None);
        }

        let array = JByteArray::from(obj);
        let item = self.copy_item(env, &array);
        if let Err(e) = env.delete_local_ref(array) {
            warn!(error = %e, "Failed to delete local reference to queue item");
        }
        item.map(Some)
    }
}

/// The SPS/PPS `byte[]` handed over at setup.
#[derive(Debug)]
pub struct JavaPayload(pub JavaRef);

impl JavaPayload {
    /// Take a global reference to `array`. `Ok(None)` for a null array.
    pub fn new(env: &mut JNIEnv<'_>, array: &JByteArray<'_>) -> Result<Option<Self>> {
        if array.is_null() {
            return Ok(None);
        }
        let r = env.new_global_ref(array);
        let global = setup_step(env, "NewGlobalRef(spsPps)", r)?;
        Ok(Some(Self(JavaRef(global))))
    }
}

impl HostHandle for JavaPayload {
    fn release(self) {
        self.0.release();
    }
}

impl ParamSetSource<JNIEnv<'static>> for JavaPayload {
    fn copy_bytes(&self, env: &mut JNIEnv<'static>) -> std::result::Result<Vec<u8>, PayloadError> {
        // SAFETY: the global reference was taken from a byte[] and stays
        // live while `self` exists. The wrapper does not own it.
        let array = unsafe { JByteArray::from_raw(self.0 .0.as_obj().as_raw()) };
        env.convert_byte_array(&array).map_err(|e| {
            clear_exception(env);
            PayloadError(e.to_string())
        })
    }
}
