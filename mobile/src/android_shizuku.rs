// JNI calls into ShizukuBridge.java for running shell commands through Shizuku.
// On Android these are static methods on com.ruyue.flymeframetools.ShizukuBridge.
// Other platforms get stubs that report Shizuku as missing.

#[cfg(target_os = "android")]
use jni::objects::{GlobalRef, JClass, JObject, JString, JValue};

#[cfg(target_os = "android")]
use jni::{JNIEnv, JavaVM};

#[cfg(target_os = "android")]
use std::sync::OnceLock;

#[cfg(target_os = "android")]
const BRIDGE_CLASS_NAME: &str = "com.ruyue.flymeframetools.ShizukuBridge";

#[cfg(target_os = "android")]
static SHIZUKU_BRIDGE_CLASS: OnceLock<GlobalRef> = OnceLock::new();

#[cfg(target_os = "android")]
fn jni_error(context: &str, e: jni::errors::Error) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, e))
}

/// Attach the current thread to the app's JVM and run `f` with its env.
#[cfg(target_os = "android")]
fn with_env<T>(f: impl FnOnce(&mut JNIEnv<'_>) -> std::io::Result<T>) -> std::io::Result<T> {
    let ctx = ndk_context::android_context();
    // SAFETY: ndk_context hands out the process JavaVM pointer, valid for the process lifetime.
    let vm = unsafe { JavaVM::from_raw(ctx.vm().cast()) }.map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Failed to get JVM: {}", e),
        )
    })?;
    let mut guard = vm
        .attach_current_thread()
        .map_err(|e| jni_error("Failed to attach thread", e))?;
    f(&mut *guard)
}

/// Load ShizukuBridge through the activity's class loader; `find_class` from a
/// native thread only sees system classes.
#[cfg(target_os = "android")]
fn load_bridge_class(env: &mut JNIEnv<'_>) -> std::io::Result<GlobalRef> {
    let ctx = ndk_context::android_context();
    // SAFETY: the context pointer is the NativeActivity/Application jobject owned by the runtime.
    let activity = unsafe { JObject::from_raw(ctx.context().cast()) };

    let class_loader = env
        .call_method(&activity, "getClassLoader", "()Ljava/lang/ClassLoader;", &[])
        .and_then(|v| v.l())
        .map_err(|e| jni_error("Failed to get class loader", e))?;

    let class_name = env
        .new_string(BRIDGE_CLASS_NAME)
        .map_err(|e| jni_error("Failed to create class name string", e))?;

    let bridge_class = env
        .call_method(
            &class_loader,
            "loadClass",
            "(Ljava/lang/String;)Ljava/lang/Class;",
            &[JValue::Object(&class_name)],
        )
        .and_then(|v| v.l())
        .map_err(|e| jni_error("Failed to load ShizukuBridge class", e))?;

    let global = env
        .new_global_ref(bridge_class)
        .map_err(|e| jni_error("Failed to create global ref", e))?;
    tracing::info!("ShizukuBridge class initialized");
    Ok(global)
}

/// Run `f` with the cached ShizukuBridge class, loading it on first use.
#[cfg(target_os = "android")]
fn with_bridge<T>(
    f: impl FnOnce(&mut JNIEnv<'_>, &JClass<'_>) -> std::io::Result<T>,
) -> std::io::Result<T> {
    with_env(|env| {
        let class = match SHIZUKU_BRIDGE_CLASS.get() {
            Some(class) => class,
            None => {
                let loaded = load_bridge_class(env)?;
                SHIZUKU_BRIDGE_CLASS.get_or_init(|| loaded)
            }
        };
        let jclass: &JClass = class.as_obj().into();
        f(env, jclass)
    })
}

#[cfg(target_os = "android")]
fn call_bool(method: &str) -> bool {
    let result = with_bridge(|env, class| {
        env.call_static_method(class, method, "()Z", &[])
            .and_then(|v| v.z())
            .map_err(|e| jni_error(method, e))
    });
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::error!("ShizukuBridge.{}() failed: {}", method, e);
            false
        }
    }
}

/// Shizuku service is running and reachable.
#[cfg(target_os = "android")]
pub fn shizuku_is_available() -> bool {
    call_bool("isAvailable")
}

#[cfg(target_os = "android")]
pub fn shizuku_has_permission() -> bool {
    call_bool("hasPermission")
}

/// Show Shizuku's consent dialog. The answer arrives asynchronously;
/// poll `shizuku_has_permission`.
#[cfg(target_os = "android")]
pub fn shizuku_request_permission() {
    let result = with_bridge(|env, class| {
        env.call_static_method(class, "requestPermission", "()V", &[])
            .map(|_| ())
            .map_err(|e| jni_error("requestPermission", e))
    });
    if let Err(e) = result {
        tracing::error!("shizuku_request_permission failed: {}", e);
    }
}

/// 0=not bound, 1=binding, 2=bound, 3=failed
#[cfg(target_os = "android")]
pub fn shizuku_get_bind_state() -> i32 {
    with_bridge(|env, class| {
        env.call_static_method(class, "getBindState", "()I", &[])
            .and_then(|v| v.i())
            .map_err(|e| jni_error("getBindState", e))
    })
    .unwrap_or(0)
}

/// Start binding the ShellService. Only true if it was already bound.
#[cfg(target_os = "android")]
pub fn shizuku_bind_service() -> bool {
    call_bool("bindService")
}

#[cfg(target_os = "android")]
pub fn shizuku_is_service_bound() -> bool {
    call_bool("isServiceBound")
}

/// Run a shell command in the Shizuku ShellService and return its output.
#[cfg(target_os = "android")]
pub fn shizuku_exec(command: &str) -> std::io::Result<String> {
    let output: String = with_bridge(|env, class| {
        let j_command = env
            .new_string(command)
            .map_err(|e| jni_error("Failed to create Java string", e))?;

        let result = env
            .call_static_method(
                class,
                "execCommand",
                "(Ljava/lang/String;)Ljava/lang/String;",
                &[JValue::Object(&j_command)],
            )
            .and_then(|v| v.l())
            .map_err(|e| jni_error("execCommand call failed", e))?;

        let output = env
            .get_string(&JString::from(result))
            .map_err(|e| jni_error("Failed to convert result string", e))?;
        Ok(output.into())
    })?;

    // The bridge reports failures in-band.
    if output.starts_with("ERROR: ") {
        Err(std::io::Error::new(std::io::ErrorKind::Other, output))
    } else {
        Ok(output)
    }
}

// --- Non-Android stubs ---

#[cfg(not(target_os = "android"))]
pub fn shizuku_is_available() -> bool {
    false
}

#[cfg(not(target_os = "android"))]
pub fn shizuku_has_permission() -> bool {
    false
}

#[cfg(not(target_os = "android"))]
pub fn shizuku_request_permission() {
    tracing::warn!("Shizuku permission requested on a platform without Shizuku");
}

#[cfg(not(target_os = "android"))]
pub fn shizuku_get_bind_state() -> i32 {
    0
}

#[cfg(not(target_os = "android"))]
pub fn shizuku_bind_service() -> bool {
    false
}

#[cfg(not(target_os = "android"))]
pub fn shizuku_is_service_bound() -> bool {
    false
}

#[cfg(not(target_os = "android"))]
pub fn shizuku_exec(_command: &str) -> std::io::Result<String> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "Shizuku not available on this platform",
    ))
}
