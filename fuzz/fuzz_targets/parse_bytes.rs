#![no_main]
use libfuzzer_sys::fuzz_target;
use minielf::ElfFile;

fuzz_target!(|data: &[u8]| {
    let elf = ElfFile::from_bytes(data.to_vec());
    let _ = elf.diagnostics().to_string();
    // Queries must be total on any input.
    let _ = elf.nearest_symbol(u64::MAX);
    let _ = elf.symbol_by_address(0);
    let _ = elf.section_by_address(0x1000);
    let _ = elf.symbol_by_name("main");
    for sym in elf.symbols() {
        let _ = elf.symbol_by_address(sym.address);
        let _ = sym.demangled_name();
    }
});
