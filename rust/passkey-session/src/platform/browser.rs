//! `navigator.credentials` in the browser.
//!
//! [`BrowserAuthenticator`] translates [`CreationOptions`] and
//! [`RequestOptions`] into the JavaScript option objects, wires the
//! cancellation token to an `AbortController` and copies the returned
//! `ArrayBuffer`s out into Rust byte vectors.

use super::{
    Assertion, CreationOptions, Mediation, NewCredential, PlatformAuthenticator, RequestOptions,
};
use crate::PlatformError;
use js_sys::{Array, Object, Reflect, Uint8Array};
use passkey_credentials::Transport;
use tokio_util::sync::CancellationToken;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::AbortController;

/// The browser's platform credential capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserAuthenticator;

impl BrowserAuthenticator {
    /// Create a handle to `navigator.credentials`.
    pub fn new() -> Self {
        Self
    }
}

impl PlatformAuthenticator for BrowserAuthenticator {
    async fn create(
        &self,
        options: &CreationOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<NewCredential>, PlatformError> {
        let public_key_opts = Object::new();

        js_set(
            &public_key_opts,
            "challenge",
            &Uint8Array::from(options.challenge.as_slice()),
        )?;

        let rp = Object::new();
        js_set(&rp, "id", &JsValue::from_str(&options.rp_id))?;
        js_set(&rp, "name", &JsValue::from_str(&options.rp_name))?;
        js_set(&public_key_opts, "rp", &rp)?;

        let user = Object::new();
        js_set(&user, "id", &Uint8Array::from(options.user_id.as_slice()))?;
        js_set(&user, "name", &JsValue::from_str(&options.user_name))?;
        js_set(
            &user,
            "displayName",
            &JsValue::from_str(&options.user_display_name),
        )?;
        js_set(&public_key_opts, "user", &user)?;

        // Preference order is the array order
        let params = Array::new();
        for algorithm in &options.algorithms {
            let param = Object::new();
            js_set(&param, "type", &JsValue::from_str("public-key"))?;
            js_set(
                &param,
                "alg",
                &JsValue::from_f64(algorithm.cose_identifier() as f64),
            )?;
            params.push(&param);
        }
        js_set(&public_key_opts, "pubKeyCredParams", &params)?;

        let auth_selection = Object::new();
        js_set(
            &auth_selection,
            "residentKey",
            &JsValue::from_str(if options.resident_key_required {
                "required"
            } else {
                "preferred"
            }),
        )?;
        js_set(
            &auth_selection,
            "requireResidentKey",
            &JsValue::from_bool(options.resident_key_required),
        )?;
        js_set(
            &auth_selection,
            "userVerification",
            &JsValue::from_str(options.user_verification.as_str()),
        )?;
        js_set(&public_key_opts, "authenticatorSelection", &auth_selection)?;

        js_set(
            &public_key_opts,
            "timeout",
            &JsValue::from_f64(options.timeout.as_millis() as f64),
        )?;

        let js_options = Object::new();
        js_set(&js_options, "publicKey", &public_key_opts)?;

        let Some(credential) = call_credentials("create", &js_options, cancel).await? else {
            return Ok(None);
        };

        let id = array_buffer_to_vec(&js_get(&credential, "rawId")?);
        let response = js_get(&credential, "response")?;

        let public_key = call_optional(&response, "getPublicKey")?
            .filter(|buffer| !buffer.is_null() && !buffer.is_undefined())
            .map(|buffer| array_buffer_to_vec(&buffer));
        let algorithm = call_optional(&response, "getPublicKeyAlgorithm")?
            .and_then(|algorithm| algorithm.as_f64())
            .map(|algorithm| algorithm as i64);
        let transports = call_optional(&response, "getTransports")?
            .map(|list| transports_from(&list))
            .unwrap_or_default();

        Ok(Some(NewCredential {
            id,
            public_key,
            algorithm,
            transports,
        }))
    }

    async fn get(
        &self,
        options: &RequestOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<Assertion>, PlatformError> {
        let public_key_opts = Object::new();

        js_set(
            &public_key_opts,
            "challenge",
            &Uint8Array::from(options.challenge.as_slice()),
        )?;
        js_set(&public_key_opts, "rpId", &JsValue::from_str(&options.rp_id))?;
        js_set(
            &public_key_opts,
            "userVerification",
            &JsValue::from_str(options.user_verification.as_str()),
        )?;
        js_set(
            &public_key_opts,
            "timeout",
            &JsValue::from_f64(options.timeout.as_millis() as f64),
        )?;

        let allow_creds = Array::new();
        for credential in &options.allow_credentials {
            let descriptor = Object::new();
            js_set(&descriptor, "type", &JsValue::from_str("public-key"))?;
            js_set(
                &descriptor,
                "id",
                &Uint8Array::from(credential.id.as_slice()),
            )?;
            let transports = Array::new();
            for transport in &credential.transports {
                transports.push(&JsValue::from_str(transport.as_str()));
            }
            js_set(&descriptor, "transports", &transports)?;
            allow_creds.push(&descriptor);
        }
        js_set(&public_key_opts, "allowCredentials", &allow_creds)?;

        let js_options = Object::new();
        js_set(&js_options, "publicKey", &public_key_opts)?;
        if options.mediation == Mediation::Conditional {
            js_set(
                &js_options,
                "mediation",
                &JsValue::from_str(options.mediation.as_str()),
            )?;
        }

        let Some(credential) = call_credentials("get", &js_options, cancel).await? else {
            return Ok(None);
        };

        let credential_id = array_buffer_to_vec(&js_get(&credential, "rawId")?);
        let response = js_get(&credential, "response")?;
        let user_handle = js_get(&response, "userHandle")?;

        Ok(Some(Assertion {
            credential_id,
            authenticator_data: array_buffer_to_vec(&js_get(&response, "authenticatorData")?),
            client_data_json: array_buffer_to_vec(&js_get(&response, "clientDataJSON")?),
            signature: array_buffer_to_vec(&js_get(&response, "signature")?),
            user_handle: (!user_handle.is_null() && !user_handle.is_undefined())
                .then(|| array_buffer_to_vec(&user_handle)),
            transports: Vec::new(),
        }))
    }
}

/// Call `navigator.credentials[method](options)` with an abort signal tied
/// to `cancel`. Resolves to `None` when the promise resolves to `null`.
async fn call_credentials(
    method: &str,
    options: &Object,
    cancel: &CancellationToken,
) -> Result<Option<JsValue>, PlatformError> {
    if cancel.is_cancelled() {
        return Err(PlatformError::Aborted);
    }

    let controller =
        AbortController::new().map_err(|e| PlatformError::Other(format!("{e:?}")))?;
    js_set(options, "signal", &controller.signal())?;

    // Fires on cancellation or once the call settles, whichever comes first.
    let scope = cancel.child_token();
    {
        let scope = scope.clone();
        let cancel = cancel.clone();
        let controller = controller.clone();
        wasm_bindgen_futures::spawn_local(async move {
            scope.cancelled().await;
            if cancel.is_cancelled() {
                controller.abort();
            }
        });
    }

    let credentials = get_credentials_container()?;
    let function: js_sys::Function = js_get(&credentials, method)?.unchecked_into();
    let outcome = match function.call1(&credentials, options) {
        Ok(promise) => JsFuture::from(js_sys::Promise::from(promise)).await,
        Err(e) => Err(e),
    };
    scope.cancel();

    match outcome {
        Ok(value) if value.is_null() || value.is_undefined() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(_) if cancel.is_cancelled() => Err(PlatformError::Aborted),
        Err(e) => Err(platform_error(&e)),
    }
}

/// Map a rejected promise to a [`PlatformError`] by its `DOMException` name.
fn platform_error(error: &JsValue) -> PlatformError {
    let name = Reflect::get(error, &JsValue::from_str("name"))
        .ok()
        .and_then(|name| name.as_string())
        .unwrap_or_default();
    let message = Reflect::get(error, &JsValue::from_str("message"))
        .ok()
        .and_then(|message| message.as_string())
        .unwrap_or_else(|| format!("{error:?}"));
    match name.as_str() {
        "AbortError" => PlatformError::Aborted,
        "NotAllowedError" => PlatformError::NotAllowed(message),
        "NotSupportedError" => PlatformError::NotAvailable(message),
        _ => PlatformError::Other(format!("{name}: {message}")),
    }
}

/// Call a zero-argument method if the object has it.
fn call_optional(obj: &JsValue, method: &str) -> Result<Option<JsValue>, PlatformError> {
    let Ok(function) = js_get(obj, method)?.dyn_into::<js_sys::Function>() else {
        return Ok(None);
    };
    function
        .call0(obj)
        .map(Some)
        .map_err(|e| PlatformError::Other(format!("{method} failed: {e:?}")))
}

/// Transport hints from a JS string array; unknown names are dropped.
fn transports_from(list: &JsValue) -> Vec<Transport> {
    if !Array::is_array(list) {
        return Vec::new();
    }
    Array::from(list)
        .iter()
        .filter_map(|value| value.as_string())
        .filter_map(|name| name.parse().ok())
        .collect()
}

/// Get `navigator.credentials`.
fn get_credentials_container() -> Result<JsValue, PlatformError> {
    let global = js_sys::global();
    let navigator = Reflect::get(&global, &"navigator".into())
        .map_err(|_| PlatformError::NotAvailable("navigator not found".into()))?;
    if navigator.is_undefined() {
        return Err(PlatformError::NotAvailable("navigator is undefined".into()));
    }
    let credentials = Reflect::get(&navigator, &"credentials".into())
        .map_err(|_| PlatformError::NotAvailable("credentials not found".into()))?;
    if credentials.is_undefined() {
        return Err(PlatformError::NotAvailable(
            "navigator.credentials is undefined".into(),
        ));
    }
    Ok(credentials)
}

/// Shorthand for `Reflect::get` with a string key.
fn js_get(obj: &JsValue, key: &str) -> Result<JsValue, PlatformError> {
    Reflect::get(obj, &JsValue::from_str(key))
        .map_err(|e| PlatformError::Other(format!("failed to get '{key}': {e:?}")))
}

/// Shorthand for `Reflect::set` with a string key.
fn js_set(obj: &Object, key: &str, value: &JsValue) -> Result<(), PlatformError> {
    Reflect::set(obj, &JsValue::from_str(key), value)
        .map_err(|e| PlatformError::Other(format!("failed to set '{key}': {e:?}")))?;
    Ok(())
}

/// Convert a JS `ArrayBuffer` (or typed-array view) to `Vec<u8>`.
fn array_buffer_to_vec(value: &JsValue) -> Vec<u8> {
    let array = Uint8Array::new(value);
    let mut bytes = vec![0u8; array.length() as usize];
    array.copy_to(&mut bytes);
    bytes
}
