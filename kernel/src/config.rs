//! Numeric constants shared by every subsystem: pool sizes, timing, and the
//! fixed memory/device layout of the target machine. Grouped here instead of
//! scattered across modules so the whole machine description lives in one
//! place.

/// Processor word size, in bytes.
pub const WORD_LEN: usize = 4;
/// Page size for the demand-paged user address space.
pub const PAGE_SIZE: usize = 4096;

/// Fixed PCB pool size.
pub const N_PROC: usize = 50;
/// Fixed message-record pool size.
pub const N_MSG: usize = 50;
/// Maximum number of user processes (one ASID each, ASID 0 is the kernel).
pub const UPROC_MAX: usize = 8;
/// Swap-pool frame count (two frames per potential user process).
pub const N_FRAMES: usize = UPROC_MAX * 2;
/// Page-table entries per user process; the last entry is the stack page.
pub const USER_PGTBL_SIZE: usize = 32;
pub const STACK_PAGE_INDEX: usize = USER_PGTBL_SIZE - 1;

/// Scheduling quantum, microseconds.
pub const TIME_SLICE_US: u32 = 5_000;
/// Pseudo-clock tick period, microseconds.
pub const PSECOND_US: u32 = 100_000;

/// External interrupt lines carrying device banks (lines 0 and 1 are
/// reserved for inter-processor and the PLT/interval timer respectively).
pub const LINE_INTERPROCESSOR: u8 = 0;
pub const LINE_PLT: u8 = 1;
pub const LINE_INTERVAL_TIMER: u8 = 2;
pub const LINE_DEVICE_FIRST: u8 = 3;
pub const LINE_DEVICE_LAST: u8 = 6;
pub const LINE_TERMINAL: u8 = 7;
pub const N_DEVICE_LINES: usize = (LINE_DEVICE_LAST - LINE_DEVICE_FIRST + 1) as usize;
pub const DEVICES_PER_LINE: usize = 8;

/// Device bus base address and per-slot stride (status, command, data0, data1).
pub const DEVICE_REG_BASE: u32 = 0x1000_0054;
pub const DEVICE_REG_LINE_STRIDE: u32 = 0x80;
pub const DEVICE_REG_DEV_STRIDE: u32 = 0x10;

/// Command codes understood by the device-register ABI.
pub const CMD_ACK: u32 = 1;
pub const CMD_PRINTCHR: u32 = 2;
pub const CMD_FLASH_READ: u32 = 2;
pub const CMD_FLASH_WRITE: u32 = 3;

/// Status values latched in a device's status register.
pub const STATUS_TERM_OK_CHAR_TRANS: u32 = 5;
pub const STATUS_FLASH_READY: u32 = 1;
pub const STATUS_MASK_LOW_BYTE: u32 = 0xFF;

/// Sentinels shared with the message/result-register ABI.
pub const NOPROC: i32 = -1;
pub const MSGNOGOOD: i32 = -1;
pub const DEST_NOT_EXIST: i32 = -2;
pub const ANYMESSAGE: u32 = 0;
pub const PARENT: u32 = 0;

/// Kernel syscall selectors (written to `a0` before a SYSCALL instruction).
pub const SYS_SEND: i32 = -1;
pub const SYS_RECEIVE: i32 = -2;

/// User syscall selectors (relayed by the support-level handler).
pub const USYS_SENDMSG: u32 = 1;
pub const USYS_RECEIVEMSG: u32 = 2;

/// SSI service codes.
pub const SVC_CREATEPROCESS: u32 = 1;
pub const SVC_TERMPROCESS: u32 = 2;
pub const SVC_DOIO: u32 = 3;
pub const SVC_GETTIME: u32 = 4;
pub const SVC_CLOCKWAIT: u32 = 5;
pub const SVC_GETSUPPORTPTR: u32 = 6;
pub const SVC_GETPROCESSID: u32 = 7;
pub const SVC_ENDIO: u32 = 8;

/// SST service codes, forwarded to a process's own broker.
pub const SST_GET_TOD: u32 = 1;
pub const SST_TERMINATE: u32 = 2;
pub const SST_WRITEPRINTER: u32 = 3;
pub const SST_WRITETERMINAL: u32 = 4;

/// Cause-register exception codes (after `(cause & GETEXECCODE) >> CAUSESHIFT`).
pub const EXC_INT: u32 = 0;
pub const EXC_MOD: u32 = 1;
pub const EXC_TLBL: u32 = 2;
pub const EXC_TLBS: u32 = 3;
pub const EXC_ADEL: u32 = 4;
pub const EXC_ADES: u32 = 5;
pub const EXC_IBE: u32 = 6;
pub const EXC_DBE: u32 = 7;
pub const EXC_SYS: u32 = 8;
pub const EXC_BP: u32 = 9;
pub const EXC_RI: u32 = 10;
pub const EXC_CPU: u32 = 11;
pub const EXC_OV: u32 = 12;

/// User process image layout.
pub const UPROC_START_ADDR: u32 = 0x8000_00B0;
pub const USER_STACK_TOP: u32 = 0xC000_0000;
pub const SWAP_POOL_AREA: u32 = 0x2002_0000;

/// Stack page encoding in `entry_hi`'s VPN field (the user segment's
/// catch-all shared-page marker, folded to the last page-table slot).
pub const STACK_PAGE_VPN: u32 = 0x3_FFFF;
