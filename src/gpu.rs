//! Metal host orchestration: device setup, the per-batch search loop, and
//! the cross-validation harness.
//!
//! One kernel is in flight at a time; the single synchronisation point per
//! batch is the 4-byte found-flag read-back. Reading the full 20 MiB of
//! candidate addresses is exactly what the in-kernel matcher avoids.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::SecretKey;
use metal::{
    Buffer, CommandQueue, CompileOptions, ComputePipelineState, Device, Library,
    MTLCommandBufferStatus, MTLResourceOptions, MTLSize,
};
use rand::rngs::OsRng;

use crate::crypto;
use crate::error::{Result, SearchError};
use crate::pattern::{PatternDescriptor, DESCRIPTOR_BYTES};
use crate::search::{FoundWallet, SearchOutcome, SearchStats};
use crate::table;
use crate::uint256::Uint256;

/// Lanes per batch. Equal to the table size: lane gid adds gid*G.
pub const GLOBAL_SIZE: usize = table::TABLE_ENTRIES;
/// Workgroup width; the batch inversion is sized for exactly this.
pub const LOCAL_SIZE: usize = 256;

const KERNEL_SOURCE: &str = include_str!("vanity.metal");

/// GPU search backend. Owns every device object; Metal releases them when
/// this is dropped, on success, error, and unwind alike.
pub struct GpuSearcher {
    device: Device,
    queue: CommandQueue,
    search_pipeline: ComputePipelineState,
    verify_pipeline: ComputePipelineState,
    table_buf: Buffer,
    base_buf: Buffer,
    pattern_buf: Buffer,
    flag_buf: Buffer,
    gid_buf: Buffer,
    out_buf: Buffer,
}

// Metal objects are only touched from the thread driving the search loop;
// the handle itself crosses the spawn boundary.
unsafe impl Send for GpuSearcher {}
unsafe impl Sync for GpuSearcher {}

impl GpuSearcher {
    /// Enumerate the GPU, compile the kernel from source, create the queue
    /// and all device buffers, and upload the table and the pattern
    /// descriptor once.
    pub fn new(descriptor: &PatternDescriptor, table_path: &Path) -> Result<Self> {
        let device = Device::system_default()
            .ok_or_else(|| SearchError::NoGpuAvailable("no Metal device present".into()))?;
        println!("[GPU] Device: {}", device.name());

        let library = compile_kernel(&device)?;
        let search_pipeline = make_pipeline(&device, &library, "vanity_search")?;
        let verify_pipeline = make_pipeline(&device, &library, "derive_addresses")?;

        if (search_pipeline.max_total_threads_per_threadgroup() as usize) < LOCAL_SIZE {
            return Err(SearchError::DeviceInit {
                stage: "pipeline",
                detail: format!(
                    "device limit {} is below the required threadgroup of {}",
                    search_pipeline.max_total_threads_per_threadgroup(),
                    LOCAL_SIZE
                ),
            });
        }

        let queue = device.new_command_queue();

        let table = table::load_or_generate(table_path)?;
        let storage = MTLResourceOptions::StorageModeShared;
        let table_bytes = table.bytes();
        let table_buf = device.new_buffer_with_data(
            table_bytes.as_ptr() as *const _,
            table_bytes.len() as u64,
            storage,
        );
        println!(
            "[GPU] Table uploaded: {} MB, batch = {} keys",
            table_bytes.len() / (1024 * 1024),
            GLOBAL_SIZE
        );

        let desc_bytes = descriptor.to_bytes();
        let pattern_buf = device.new_buffer_with_data(
            desc_bytes.as_ptr() as *const _,
            DESCRIPTOR_BYTES as u64,
            storage,
        );

        Ok(Self {
            base_buf: device.new_buffer(96, storage),
            flag_buf: device.new_buffer(4, storage),
            gid_buf: device.new_buffer(4, storage),
            out_buf: device.new_buffer(20, storage),
            table_buf,
            pattern_buf,
            queue,
            search_pipeline,
            verify_pipeline,
            device,
        })
    }

    pub fn name(&self) -> String {
        format!("GPU ({})", self.device.name())
    }

    /// The per-batch search loop. Blocks until a verified match, an error,
    /// or cancellation (polled between batches; an in-flight kernel always
    /// runs to completion).
    pub fn run(&self, cancel: &AtomicBool, stats: &SearchStats) -> Result<SearchOutcome> {
        let mut base = random_base();

        loop {
            if cancel.load(Ordering::SeqCst) {
                return Ok(SearchOutcome::Cancelled);
            }

            // 1. reset the flag and gid
            unsafe {
                *(self.flag_buf.contents() as *mut u32) = 0;
                *(self.gid_buf.contents() as *mut u32) = 0;
            }

            // 2. B = base*G on CPU, uploaded as a 96-byte Jacobian (Z = 1)
            self.upload_base_point(&base.to_be_bytes())?;

            // 3. one batch
            self.dispatch_search()?;

            // 4. the only read-back on the happy path
            let flag = unsafe { *(self.flag_buf.contents() as *const u32) };
            if flag != 0 {
                return self.collect_result(&base, stats);
            }

            // 5. advance
            stats.add_attempts(GLOBAL_SIZE as u64);
            base = base.wrapping_add_u32(GLOBAL_SIZE as u32);
            if !base_window_valid(&base) {
                base = random_base();
            }
        }
    }

    fn dispatch_search(&self) -> Result<()> {
        let cmd = self.queue.new_command_buffer();
        {
            let enc = cmd.new_compute_command_encoder();
            enc.set_compute_pipeline_state(&self.search_pipeline);
            enc.set_buffer(0, Some(&self.base_buf), 0);
            enc.set_buffer(1, Some(&self.table_buf), 0);
            enc.set_buffer(2, Some(&self.pattern_buf), 0);
            enc.set_buffer(3, Some(&self.flag_buf), 0);
            enc.set_buffer(4, Some(&self.gid_buf), 0);
            enc.set_buffer(5, Some(&self.out_buf), 0);
            enc.dispatch_thread_groups(
                MTLSize {
                    width: (GLOBAL_SIZE / LOCAL_SIZE) as u64,
                    height: 1,
                    depth: 1,
                },
                MTLSize {
                    width: LOCAL_SIZE as u64,
                    height: 1,
                    depth: 1,
                },
            );
            enc.end_encoding();
        }
        cmd.commit();
        cmd.wait_until_completed();
        if cmd.status() == MTLCommandBufferStatus::Error {
            return Err(SearchError::Dispatch(format!(
                "command buffer finished with status {:?}",
                cmd.status()
            )));
        }
        Ok(())
    }

    /// Read back gid and address, reconstruct the private key as
    /// base + gid mod 2^256, re-derive on CPU, and only then surface the
    /// result. A mismatch is a kernel bug, never a silent false positive.
    fn collect_result(&self, base: &Uint256, stats: &SearchStats) -> Result<SearchOutcome> {
        let gid = unsafe { *(self.gid_buf.contents() as *const u32) };
        let mut device_addr = [0u8; 20];
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.out_buf.contents() as *const u8,
                device_addr.as_mut_ptr(),
                20,
            );
        }
        if gid as usize >= GLOBAL_SIZE {
            return Err(SearchError::Dispatch(format!(
                "device reported out-of-range gid {}",
                gid
            )));
        }

        let key = base.wrapping_add_u32(gid);
        let key_bytes = key.to_be_bytes();
        let cpu_addr = crypto::derive_address(&key_bytes).ok_or_else(|| {
            SearchError::VerificationMismatch {
                device: crypto::address_hex(&device_addr),
                cpu: "reconstructed key is not a usable private key".into(),
            }
        })?;
        if cpu_addr != device_addr {
            return Err(SearchError::VerificationMismatch {
                device: crypto::address_hex(&device_addr),
                cpu: crypto::address_hex(&cpu_addr),
            });
        }

        Ok(SearchOutcome::Found(FoundWallet {
            address: crypto::address_hex(&cpu_addr),
            private_key: hex::encode(key_bytes),
            attempts: stats.attempts() + gid as u64 + 1,
            elapsed: stats.elapsed(),
        }))
    }

    fn upload_base_point(&self, key_bytes: &[u8; 32]) -> Result<()> {
        let secret = SecretKey::from_slice(key_bytes)
            .map_err(|e| SearchError::Dispatch(format!("base key rejected: {}", e)))?;
        let encoded = secret.public_key().to_encoded_point(false);
        let sec1 = encoded.as_bytes(); // 0x04 | X | Y, big-endian

        let mut jac = [0u8; 96];
        for i in 0..32 {
            jac[i] = sec1[32 - i]; // X, little-endian
            jac[32 + i] = sec1[64 - i]; // Y, little-endian
        }
        jac[64] = 1; // Z = 1

        unsafe {
            std::ptr::copy_nonoverlapping(
                jac.as_ptr(),
                self.base_buf.contents() as *mut u8,
                96,
            );
        }
        Ok(())
    }

    /// Cross-validation: derive `count` addresses for keys base_key + gid on
    /// the device and hand them all back for comparison against the CPU.
    pub fn verify_batch(&self, base_key: &[u8; 32], count: u32) -> Result<Vec<[u8; 20]>> {
        if count == 0 || count as usize > table::TABLE_ENTRIES {
            return Err(SearchError::Dispatch(format!(
                "verification batch of {} is outside 1..={}",
                count,
                table::TABLE_ENTRIES
            )));
        }
        self.upload_base_point(base_key)?;

        let storage = MTLResourceOptions::StorageModeShared;
        let out_buf = self.device.new_buffer(count as u64 * 20, storage);
        let count_buf =
            self.device
                .new_buffer_with_data(&count as *const u32 as *const _, 4, storage);

        let cmd = self.queue.new_command_buffer();
        {
            let enc = cmd.new_compute_command_encoder();
            enc.set_compute_pipeline_state(&self.verify_pipeline);
            enc.set_buffer(0, Some(&self.base_buf), 0);
            enc.set_buffer(1, Some(&self.table_buf), 0);
            enc.set_buffer(2, Some(&out_buf), 0);
            enc.set_buffer(3, Some(&count_buf), 0);
            let group = 64u64;
            enc.dispatch_thread_groups(
                MTLSize {
                    width: (count as u64 + group - 1) / group,
                    height: 1,
                    depth: 1,
                },
                MTLSize {
                    width: group,
                    height: 1,
                    depth: 1,
                },
            );
            enc.end_encoding();
        }
        cmd.commit();
        cmd.wait_until_completed();
        if cmd.status() == MTLCommandBufferStatus::Error {
            return Err(SearchError::Dispatch(
                "verification dispatch failed".into(),
            ));
        }

        let mut out = Vec::with_capacity(count as usize);
        let ptr = out_buf.contents() as *const u8;
        for i in 0..count as usize {
            let mut addr = [0u8; 20];
            unsafe {
                std::ptr::copy_nonoverlapping(ptr.add(i * 20), addr.as_mut_ptr(), 20);
            }
            out.push(addr);
        }
        Ok(out)
    }
}

fn compile_kernel(device: &Device) -> Result<Library> {
    device
        .new_library_with_source(KERNEL_SOURCE, &CompileOptions::new())
        .map_err(|log| SearchError::DeviceInit {
            stage: "kernel compile",
            // the Metal error string is the compiler log; pass it through
            detail: log.to_string(),
        })
}

fn make_pipeline(
    device: &Device,
    library: &Library,
    name: &'static str,
) -> Result<ComputePipelineState> {
    let function = library
        .get_function(name, None)
        .map_err(|e| SearchError::DeviceInit {
            stage: "kernel lookup",
            detail: format!("{}: {}", name, e),
        })?;
    device
        .new_compute_pipeline_state_with_function(&function)
        .map_err(|e| SearchError::DeviceInit {
            stage: "pipeline",
            detail: format!("{}: {}", name, e),
        })
}

/// Fresh random base scalar from the OS entropy source, re-drawn until the
/// whole batch window [base, base + 2^20] stays below the curve order.
fn random_base() -> Uint256 {
    loop {
        let secret = SecretKey::random(&mut OsRng);
        let base = Uint256::from_be_bytes(&secret.to_bytes().into());
        if base_window_valid(&base) {
            return base;
        }
    }
}

fn base_window_valid(base: &Uint256) -> bool {
    crypto::is_valid_private_key(&base.to_be_bytes())
        && crypto::is_valid_private_key(
            &base.wrapping_add_u32(GLOBAL_SIZE as u32).to_be_bytes(),
        )
}
