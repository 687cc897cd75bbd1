//! In-memory ELF64 image builder for unit tests.
//!
//! Layout: file header, optional program header table, section contents
//! (8-byte aligned), `.shstrtab`, then the section header table. Index 0 is
//! the null section and `.shstrtab` is always the last section.

use crate::formats::elf::types::*;

/// A symbol record to place in a built symbol table.
#[derive(Debug, Clone)]
pub(crate) struct TestSymbol {
    pub name: String,
    pub info: u8,
    pub other: u8,
    pub shndx: u16,
    pub value: u64,
    pub size: u64,
}

impl TestSymbol {
    pub fn new(name: &str, kind: u8, value: u64, size: u64) -> Self {
        Self {
            name: name.to_string(),
            info: (STB_GLOBAL << 4) | kind,
            other: STV_DEFAULT,
            shndx: 1,
            value,
            size,
        }
    }

    pub fn func(name: &str, value: u64, size: u64) -> Self {
        Self::new(name, STT_FUNC, value, size)
    }

    pub fn object(name: &str, value: u64, size: u64) -> Self {
        Self::new(name, STT_OBJECT, value, size)
    }
}

#[derive(Debug, Clone)]
struct ImageSection {
    name: String,
    sh_type: u32,
    flags: u64,
    addr: u64,
    data: Vec<u8>,
    size: u64,
    link: u32,
    info: u32,
    entsize: u64,
    // Replaces the sh_name offset computed from .shstrtab.
    raw_name: Option<u32>,
}

/// Builder for a little- or big-endian ELF64 image.
#[derive(Debug, Clone)]
pub(crate) struct ElfImage {
    e_type: u16,
    machine: u16,
    entry: u64,
    flags: u32,
    endian: ElfData,
    sections: Vec<ImageSection>,
    segments: Vec<ProgramHeader>,
}

impl ElfImage {
    pub fn new() -> Self {
        Self {
            e_type: 2,
            machine: 62,
            entry: 0,
            flags: 0,
            endian: ElfData::Little,
            sections: Vec::new(),
            segments: Vec::new(),
        }
    }

    pub fn file_type(mut self, e_type: u16) -> Self {
        self.e_type = e_type;
        self
    }

    pub fn machine(mut self, machine: u16) -> Self {
        self.machine = machine;
        self
    }

    pub fn entry(mut self, entry: u64) -> Self {
        self.entry = entry;
        self
    }

    pub fn flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn big_endian(mut self) -> Self {
        self.endian = ElfData::Big;
        self
    }

    /// Index the next added section will receive.
    pub fn next_index(&self) -> u32 {
        self.sections.len() as u32 + 1
    }

    pub fn section(
        mut self,
        name: &str,
        sh_type: u32,
        flags: u64,
        addr: u64,
        data: Vec<u8>,
    ) -> Self {
        let size = data.len() as u64;
        self.sections.push(ImageSection {
            name: name.to_string(),
            sh_type,
            flags,
            addr,
            data,
            size,
            link: 0,
            info: 0,
            entsize: 0,
            raw_name: None,
        });
        self
    }

    /// A `SHT_NOBITS` section occupying `size` bytes of memory and none of the file.
    pub fn nobits(mut self, name: &str, addr: u64, size: u64) -> Self {
        self.sections.push(ImageSection {
            name: name.to_string(),
            sh_type: SHT_NOBITS,
            flags: 0x3,
            addr,
            data: Vec::new(),
            size,
            link: 0,
            info: 0,
            entsize: 0,
            raw_name: None,
        });
        self
    }

    /// Add a string table named `strtab_name` followed by a symbol table
    /// (`sh_type` is `SHT_SYMTAB` or `SHT_DYNSYM`) linked to it. The null
    /// symbol is emitted first.
    pub fn symbol_table(
        self,
        sh_type: u32,
        symtab_name: &str,
        strtab_name: &str,
        symbols: &[TestSymbol],
    ) -> Self {
        let link = self.next_index();
        self.symbol_table_linked(sh_type, symtab_name, strtab_name, symbols, link)
    }

    /// Same as [`ElfImage::symbol_table`] but with an explicit `sh_link`.
    pub fn symbol_table_linked(
        self,
        sh_type: u32,
        symtab_name: &str,
        strtab_name: &str,
        symbols: &[TestSymbol],
        link: u32,
    ) -> Self {
        self.symbol_table_raw(sh_type, symtab_name, strtab_name, symbols, link, &[])
    }

    /// Symbol table whose `st_name` values for the listed symbol positions are
    /// replaced by the given raw offsets.
    pub fn symbol_table_raw(
        mut self,
        sh_type: u32,
        symtab_name: &str,
        strtab_name: &str,
        symbols: &[TestSymbol],
        link: u32,
        name_overrides: &[(usize, u32)],
    ) -> Self {
        let mut strtab = vec![0u8];
        let mut table = vec![0u8; SYM_SIZE];
        for (pos, sym) in symbols.iter().enumerate() {
            let mut name_off = if sym.name.is_empty() {
                0
            } else {
                let off = strtab.len() as u32;
                strtab.extend_from_slice(sym.name.as_bytes());
                strtab.push(0);
                off
            };
            if let Some(&(_, raw)) = name_overrides.iter().find(|(p, _)| *p == pos) {
                name_off = raw;
            }
            let mut rec = Vec::with_capacity(SYM_SIZE);
            put_u32(&mut rec, name_off, self.endian);
            rec.push(sym.info);
            rec.push(sym.other);
            put_u16(&mut rec, sym.shndx, self.endian);
            put_u64(&mut rec, sym.value, self.endian);
            put_u64(&mut rec, sym.size, self.endian);
            table.extend_from_slice(&rec);
        }

        self = self.section(strtab_name, SHT_STRTAB, 0, 0, strtab);
        let last = self.sections.len();
        self = self.section(symtab_name, sh_type, 0, 0, table);
        let sym = &mut self.sections[last];
        sym.link = link;
        sym.info = 1;
        sym.entsize = SYM_SIZE as u64;
        self
    }

    /// Override `sh_entsize` of the most recently added section.
    pub fn with_entsize(mut self, entsize: u64) -> Self {
        if let Some(last) = self.sections.last_mut() {
            last.entsize = entsize;
        }
        self
    }

    /// Override the name offset of the most recently added section.
    pub fn with_raw_name(mut self, offset: u32) -> Self {
        if let Some(last) = self.sections.last_mut() {
            last.raw_name = Some(offset);
        }
        self
    }

    pub fn segment(mut self, p_type: u32, flags: u32, vaddr: u64, memsz: u64) -> Self {
        self.segments.push(ProgramHeader {
            p_type,
            p_flags: flags,
            p_offset: 0,
            p_vaddr: vaddr,
            p_paddr: vaddr,
            p_filesz: 0,
            p_memsz: memsz,
            p_align: 0x1000,
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let e = self.endian;
        let mut out = vec![0u8; EHDR_SIZE];

        let phoff = if self.segments.is_empty() { 0 } else { out.len() as u64 };
        for ph in &self.segments {
            put_u32(&mut out, ph.p_type, e);
            put_u32(&mut out, ph.p_flags, e);
            put_u64(&mut out, ph.p_offset, e);
            put_u64(&mut out, ph.p_vaddr, e);
            put_u64(&mut out, ph.p_paddr, e);
            put_u64(&mut out, ph.p_filesz, e);
            put_u64(&mut out, ph.p_memsz, e);
            put_u64(&mut out, ph.p_align, e);
        }

        let mut shstrtab = vec![0u8];
        let mut name_offsets = Vec::with_capacity(self.sections.len());
        for sec in &self.sections {
            name_offsets.push(shstrtab.len() as u32);
            shstrtab.extend_from_slice(sec.name.as_bytes());
            shstrtab.push(0);
        }
        let shstrtab_name = shstrtab.len() as u32;
        shstrtab.extend_from_slice(b".shstrtab\0");

        let mut offsets = Vec::with_capacity(self.sections.len());
        for sec in &self.sections {
            align8(&mut out);
            offsets.push(out.len() as u64);
            out.extend_from_slice(&sec.data);
        }
        align8(&mut out);
        let shstrtab_offset = out.len() as u64;
        out.extend_from_slice(&shstrtab);

        align8(&mut out);
        let shoff = out.len() as u64;
        out.extend_from_slice(&[0u8; SHDR_SIZE]);
        for (i, sec) in self.sections.iter().enumerate() {
            let name = sec.raw_name.unwrap_or(name_offsets[i]);
            put_shdr(
                &mut out,
                e,
                [name, sec.sh_type],
                [sec.flags, sec.addr, offsets[i], sec.size],
                [sec.link, sec.info],
                [8, sec.entsize],
            );
        }
        put_shdr(
            &mut out,
            e,
            [shstrtab_name, SHT_STRTAB],
            [0, 0, shstrtab_offset, shstrtab.len() as u64],
            [0, 0],
            [1, 0],
        );

        let shnum = self.sections.len() as u16 + 2;
        let mut hdr = Vec::with_capacity(EHDR_SIZE);
        hdr.extend_from_slice(ELF_MAGIC);
        hdr.push(ELFCLASS64);
        hdr.push(if e.is_little_endian() { 1 } else { 2 });
        hdr.push(1);
        hdr.resize(16, 0);
        put_u16(&mut hdr, self.e_type, e);
        put_u16(&mut hdr, self.machine, e);
        put_u32(&mut hdr, 1, e);
        put_u64(&mut hdr, self.entry, e);
        put_u64(&mut hdr, phoff, e);
        put_u64(&mut hdr, shoff, e);
        put_u32(&mut hdr, self.flags, e);
        put_u16(&mut hdr, EHDR_SIZE as u16, e);
        put_u16(&mut hdr, PHDR_SIZE as u16, e);
        put_u16(&mut hdr, self.segments.len() as u16, e);
        put_u16(&mut hdr, SHDR_SIZE as u16, e);
        put_u16(&mut hdr, shnum, e);
        put_u16(&mut hdr, shnum - 1, e);
        out[..EHDR_SIZE].copy_from_slice(&hdr);

        out
    }
}

fn put_shdr(out: &mut Vec<u8>, e: ElfData, a: [u32; 2], b: [u64; 4], c: [u32; 2], d: [u64; 2]) {
    put_u32(out, a[0], e);
    put_u32(out, a[1], e);
    for v in b {
        put_u64(out, v, e);
    }
    put_u32(out, c[0], e);
    put_u32(out, c[1], e);
    for v in d {
        put_u64(out, v, e);
    }
}

fn align8(out: &mut Vec<u8>) {
    while out.len() % 8 != 0 {
        out.push(0);
    }
}

fn put_u16(out: &mut Vec<u8>, v: u16, e: ElfData) {
    match e {
        ElfData::Little => out.extend_from_slice(&v.to_le_bytes()),
        ElfData::Big => out.extend_from_slice(&v.to_be_bytes()),
    }
}

fn put_u32(out: &mut Vec<u8>, v: u32, e: ElfData) {
    match e {
        ElfData::Little => out.extend_from_slice(&v.to_le_bytes()),
        ElfData::Big => out.extend_from_slice(&v.to_be_bytes()),
    }
}

fn put_u64(out: &mut Vec<u8>, v: u64, e: ElfData) {
    match e {
        ElfData::Little => out.extend_from_slice(&v.to_le_bytes()),
        ElfData::Big => out.extend_from_slice(&v.to_be_bytes()),
    }
}
