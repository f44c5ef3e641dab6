//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`] and [`CredentialPort`] for the node.
//!
//! - Node configuration is a postcard blob under `vipv::nodecfg`,
//!   validated before every write.
//! - Provisioned secrets (connection string, TLS material, Wi-Fi) live in
//!   the `auth` namespace, which sits on the encrypted NVS partition on
//!   the device.  The simulation backend keeps everything in memory.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::{ConfigError, ConfigPort, Credential, CredentialPort};
use crate::config::NodeConfig;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "vipv";
const CONFIG_KEY: &str = "nodecfg";
const CRED_NAMESPACE: &str = "auth";

/// Largest blob read back (PEM certificates fit comfortably).
const MAX_BLOB_SIZE: usize = 4000;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: HashMap<String, Vec<u8>>,
}

impl NvsAdapter {
    /// Initialise NVS flash.  On first boot or after a layout version
    /// change the partition is erased and re-initialised.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the main task before any other NVS
            // access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK || unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: HashMap::new(),
        })
    }

    /// Provision a secret.  Used by the factory flow and host tests.
    pub fn store_credential(&mut self, which: Credential, data: &[u8]) -> Result<(), ConfigError> {
        self.write_blob(CRED_NAMESPACE, which.key(), data)
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_blob(&self, namespace: &str, key: &str) -> Result<Vec<u8>, ConfigError> {
        self.store
            .get(&Self::composite_key(namespace, key))
            .cloned()
            .ok_or(ConfigError::NotFound)
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_blob(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        if data.len() > MAX_BLOB_SIZE {
            return Err(ConfigError::StorageFull);
        }
        self.store
            .insert(Self::composite_key(namespace, key), data.to_vec());
        Ok(())
    }

    /// NUL-terminated copy of a namespace or key (NVS limit: 15 chars).
    #[cfg(target_os = "espidf")]
    fn c_name(name: &str) -> [u8; 16] {
        let mut buf = [0u8; 16];
        let bytes = name.as_bytes();
        let len = bytes.len().min(15);
        buf[..len].copy_from_slice(&bytes[..len]);
        buf
    }

    /// Open an NVS namespace, run `f` with the handle, then close it.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let ns = Self::c_name(namespace);
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        let mut handle: nvs_handle_t = 0;
        // SAFETY: `ns` is NUL-terminated and outlives the call.
        let ret = unsafe { nvs_open(ns.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }
        let result = f(handle);
        // SAFETY: `handle` was opened above and is closed exactly once.
        unsafe { nvs_close(handle) };
        result
    }

    #[cfg(target_os = "espidf")]
    fn read_blob(&self, namespace: &str, key: &str) -> Result<Vec<u8>, ConfigError> {
        let key = Self::c_name(key);
        let result = Self::with_nvs_handle(namespace, false, |handle| {
            let mut size: usize = 0;
            // SAFETY: a null buffer asks NVS for the stored length only.
            let ret = unsafe {
                nvs_get_blob(handle, key.as_ptr() as *const _, core::ptr::null_mut(), &mut size)
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            if size == 0 || size > MAX_BLOB_SIZE {
                return Err(ESP_ERR_NVS_INVALID_LENGTH);
            }
            let mut buf = vec![0u8; size];
            // SAFETY: `buf` holds exactly `size` bytes.
            let ret = unsafe {
                nvs_get_blob(handle, key.as_ptr() as *const _, buf.as_mut_ptr() as *mut _, &mut size)
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            buf.truncate(size);
            Ok(buf)
        });
        match result {
            Ok(bytes) => Ok(bytes),
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Err(ConfigError::NotFound),
            Err(e) => {
                warn!("NvsAdapter: read {}::{:?} failed ({})", namespace, key, e);
                Err(ConfigError::IoError)
            }
        }
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        if data.len() > MAX_BLOB_SIZE {
            return Err(ConfigError::StorageFull);
        }
        let key = Self::c_name(key);
        let result = Self::with_nvs_handle(namespace, true, |handle| {
            // SAFETY: `data` is valid for `data.len()` bytes.
            let ret = unsafe {
                nvs_set_blob(handle, key.as_ptr() as *const _, data.as_ptr() as *const _, data.len())
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            // SAFETY: `handle` is open for writing.
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        });
        result.map_err(|e| {
            warn!("NvsAdapter: write to {} failed ({})", namespace, e);
            if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE {
                ConfigError::StorageFull
            } else {
                ConfigError::IoError
            }
        })
    }
}

fn validate_config(cfg: &NodeConfig) -> Result<(), ConfigError> {
    cfg.validate().map_err(ConfigError::ValidationFailed)
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<NodeConfig, ConfigError> {
        match self.read_blob(CONFIG_NAMESPACE, CONFIG_KEY) {
            Ok(bytes) => {
                let cfg: NodeConfig =
                    postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                validate_config(&cfg)?;
                info!("NvsAdapter: loaded config ({} bytes)", bytes.len());
                Ok(cfg)
            }
            Err(ConfigError::NotFound) => {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(NodeConfig::default())
            }
            Err(e) => Err(e),
        }
    }

    fn save(&mut self, config: &NodeConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        self.write_blob(CONFIG_NAMESPACE, CONFIG_KEY, &bytes)?;
        info!("NvsAdapter: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}

impl CredentialPort for NvsAdapter {
    fn credential(&self, which: Credential) -> Result<Vec<u8>, ConfigError> {
        self.read_blob(CRED_NAMESPACE, which.key())
    }
}
