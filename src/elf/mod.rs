//! Minimal ELF64 executable builder.
//!
//! Knows nothing about the compiler; it packages byte buffers into a
//! program-header-only executable:
//!
//! ```text
//! 0x0000   ELF header          64 bytes
//! 0x0040   program headers     56 bytes each
//! 0x1000   code segment        page-aligned
//! ```
//!
//! BSS segments occupy no file space; the kernel zero-fills them on load.

use bitflags::bitflags;

pub const ELF64_HEADER_SIZE: usize = 64;
pub const ELF64_PHDR_SIZE: usize = 56;
pub const PAGE_SIZE: u64 = 0x1000;

const ELF_MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];
const ELFCLASS64: u8 = 2;
const ELFDATA2LSB: u8 = 1;
const EV_CURRENT: u8 = 1;
const ELFOSABI_NONE: u8 = 0;

const ET_EXEC: u16 = 2;
const EM_X86_64: u16 = 62;
const PT_LOAD: u32 = 1;

bitflags! {
    /// Program header permission flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SegmentFlags: u32 {
        const X = 0x1;
        const W = 0x2;
        const R = 0x4;
    }
}

/// A loadable segment: file-backed code/data, or zero-filled BSS.
enum Segment {
    Load {
        vaddr: u64,
        data: Vec<u8>,
        flags: SegmentFlags,
    },
    Bss {
        vaddr: u64,
        size: u64,
        flags: SegmentFlags,
    },
}

/// Assembles an `ET_EXEC` image from an entry point and segments.
pub struct Builder {
    entry: u64,
    segments: Vec<Segment>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder { entry: 0, segments: Vec::new() }
    }

    pub fn set_entry(&mut self, vaddr: u64) {
        self.entry = vaddr;
    }

    pub fn add_load_segment(&mut self, data: Vec<u8>, vaddr: u64, flags: SegmentFlags) {
        self.segments.push(Segment::Load { vaddr, data, flags });
    }

    pub fn add_bss_segment(&mut self, vaddr: u64, size: u64, flags: SegmentFlags) {
        self.segments.push(Segment::Bss { vaddr, size, flags });
    }

    /// Produces the final binary image.
    pub fn build(self) -> Vec<u8> {
        let header_size = ELF64_HEADER_SIZE + self.segments.len() * ELF64_PHDR_SIZE;
        let data_offset = align_up(header_size as u64, PAGE_SIZE);

        let mut out = Vec::with_capacity(data_offset as usize);
        self.write_header(&mut out);

        // program headers; file-backed segments are laid out back to back
        // starting at the first page boundary
        let mut file_offset = data_offset;
        for segment in &self.segments {
            match segment {
                Segment::Load { vaddr, data, flags } => {
                    write_phdr(&mut out, &Phdr {
                        flags: *flags,
                        offset: file_offset,
                        vaddr: *vaddr,
                        file_size: data.len() as u64,
                        mem_size: data.len() as u64,
                    });
                    file_offset += data.len() as u64;
                }
                Segment::Bss { vaddr, size, flags } => {
                    write_phdr(&mut out, &Phdr {
                        flags: *flags,
                        offset: 0,
                        vaddr: *vaddr,
                        file_size: 0,
                        mem_size: *size,
                    });
                }
            }
        }

        out.resize(data_offset as usize, 0);

        for segment in &self.segments {
            if let Segment::Load { data, .. } = segment {
                out.extend_from_slice(data);
            }
        }

        out
    }

    fn write_header(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&ELF_MAGIC);
        out.push(ELFCLASS64);
        out.push(ELFDATA2LSB);
        out.push(EV_CURRENT);
        out.push(ELFOSABI_NONE);
        out.resize(16, 0); // ABI version + padding

        push_u16(out, ET_EXEC);
        push_u16(out, EM_X86_64);
        push_u32(out, EV_CURRENT as u32);
        push_u64(out, self.entry);
        push_u64(out, ELF64_HEADER_SIZE as u64); // program headers follow immediately
        push_u64(out, 0); // no section headers
        push_u32(out, 0); // flags
        push_u16(out, ELF64_HEADER_SIZE as u16);
        push_u16(out, ELF64_PHDR_SIZE as u16);
        push_u16(out, self.segments.len() as u16);
        push_u16(out, 0); // section header entry size
        push_u16(out, 0); // section header count
        push_u16(out, 0); // string table index
    }
}

struct Phdr {
    flags: SegmentFlags,
    offset: u64,
    vaddr: u64,
    file_size: u64,
    mem_size: u64,
}

fn write_phdr(out: &mut Vec<u8>, phdr: &Phdr) {
    push_u32(out, PT_LOAD);
    push_u32(out, phdr.flags.bits());
    push_u64(out, phdr.offset);
    push_u64(out, phdr.vaddr);
    push_u64(out, phdr.vaddr); // physical address mirrors virtual
    push_u64(out, phdr.file_size);
    push_u64(out, phdr.mem_size);
    push_u64(out, PAGE_SIZE);
}

fn push_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn push_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn align_up(v: u64, align: u64) -> u64 {
    (v + align - 1) & !(align - 1)
}
