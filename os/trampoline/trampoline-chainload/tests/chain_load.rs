mod common;

use common::{RecordingLoader, SimulatedMemory};
use trampoline_addresses::{GIB, PhysicalAddress, PhysicalRange};
use trampoline_chainload::validate::validate;
use trampoline_chainload::{
    ChainLoadConfig, ChainLoadError, ChainLoader, LocatedDescriptor, MAX_DESCRIPTOR_RELOCATIONS,
    MAX_MODULE_RELOCATIONS, ModuleHandle, ModuleState, PhysicalMemory, RegionPurpose,
};
use trampoline_elf::builder::ElfBuilder;
use trampoline_elf::{ElfHeader, PFlags};
use trampoline_mbi2::builder::DescriptorBuilder;
use trampoline_mbi2::{BOOTLOADER_MAGIC, BootDescriptor, MemoryKind, MemoryMapEntry};

const IMAGE: u64 = 0x80_0000;

fn image() -> PhysicalRange {
    PhysicalRange::new(PhysicalAddress::new(IMAGE), 0x1_0000)
}

fn pa(v: u64) -> PhysicalAddress {
    PhysicalAddress::new(v)
}

fn available(base: u64, len: u64) -> MemoryMapEntry {
    MemoryMapEntry::new(base, len, MemoryKind::Available)
}

fn kernel_elf(paddr: u64, memsz: u64) -> Vec<u8> {
    ElfBuilder::elf64()
        .entry(paddr)
        .load(paddr, memsz, PFlags::new().with_read(true).with_execute(true))
        .build()
}

fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

fn descriptor_at(memory: &SimulatedMemory, addr: u64) -> BootDescriptor<'_> {
    let header = memory.bytes(PhysicalRange::new(pa(addr), 8)).unwrap();
    let total = u64::from(u32::from_le_bytes(header[0..4].try_into().unwrap()));
    BootDescriptor::parse(memory.bytes(PhysicalRange::new(pa(addr), total)).unwrap()).unwrap()
}

#[test]
fn kernel_in_free_memory_is_handed_off_without_relocation() {
    let descriptor = DescriptorBuilder::new()
        .memory_map(&[available(0x10_0000, 0x1000_0000 - 0x10_0000)])
        .module(0x20_0000, 0x20_FFFF, "kernel")
        .build();

    let mut memory = SimulatedMemory::new()
        .with_bank(0x9000, 0x1000)
        .with_bank(0x20_0000, 0x1_0000);
    memory.write(0x9000, &descriptor);
    memory.write(0x20_0000, &kernel_elf(0x100_0000, 0x8000));

    let mut loader = ChainLoader::new(&mut memory, image(), ChainLoadConfig::default());
    let handoff = loader.prepare(pa(0x9000)).unwrap();

    assert_eq!(handoff.kernel, pa(0x20_0000));
    assert_eq!(handoff.descriptor, pa(0x9000));
    assert_eq!(handoff.magic, BOOTLOADER_MAGIC);
    assert_eq!(handoff.jump_code, pa(0xFFF_F000));
    assert_eq!(loader.descriptor_relocations(), 0);
    assert_eq!(loader.module_relocations(), 0);
    assert_eq!(
        loader.modules().kernel().map(|k| k.state),
        Some(ModuleState::Consumed)
    );

    let d = descriptor_at(&memory, 0x9000);
    assert_eq!(d.cmdline(), Some("kernel"));
    assert_eq!(d.modules().count(), 0);
    assert_eq!(d.len(), descriptor.len());
}

#[test]
fn boot_calls_the_loader_once_and_reports_its_return() {
    let descriptor = DescriptorBuilder::new()
        .memory_map(&[available(0x10_0000, 0x1000_0000 - 0x10_0000)])
        .module(0x20_0000, 0x20_FFFF, "kernel")
        .build();

    let mut memory = SimulatedMemory::new()
        .with_bank(0x9000, 0x1000)
        .with_bank(0x20_0000, 0x1_0000);
    memory.write(0x9000, &descriptor);
    memory.write(0x20_0000, &kernel_elf(0x100_0000, 0x8000));

    let mut recorder = RecordingLoader::default();
    let err = ChainLoader::new(&mut memory, image(), ChainLoadConfig::default())
        .boot(pa(0x9000), &mut recorder);

    assert_eq!(err, ChainLoadError::LoaderReturned);
    assert_eq!(recorder.calls.len(), 1);
    assert_eq!(recorder.calls[0].kernel, pa(0x20_0000));
}

#[test]
fn overlapping_descriptor_is_moved_once_to_the_highest_fit() {
    let descriptor = DescriptorBuilder::new()
        .memory_map(&[available(0x10_0000, 0x1000_0000 - 0x10_0000)])
        .module(0x20_0000, 0x20_FFFF, "kernel")
        .build();
    assert!(descriptor.len() <= 0x1000);

    let mut memory = SimulatedMemory::new()
        .with_bank(0x10_1000, 0x1000)
        .with_bank(0x20_0000, 0x1_0000)
        .with_bank(0xFFF_0000, 0x1_0000);
    memory.write(0x10_1000, &descriptor);
    memory.write(0x20_0000, &kernel_elf(0x10_0000, 0x8000));

    let config = ChainLoadConfig { phys_max: 8 * GIB };
    let mut loader = ChainLoader::new(&mut memory, image(), config);
    assert_eq!(loader.ceiling(), pa(4 * GIB));

    let handoff = loader.prepare(pa(0x10_1000)).unwrap();
    assert_eq!(loader.descriptor_relocations(), 1);
    assert_eq!(loader.module_relocations(), 0);
    assert_eq!(handoff.descriptor, pa(0xFFF_F000));
    assert_eq!(loader.ceiling(), pa(0xFFF_F000));
    assert_eq!(handoff.jump_code, pa(0xFFF_E000));
    assert_eq!(handoff.kernel, pa(0x20_0000));

    let d = descriptor_at(&memory, 0xFFF_F000);
    assert_eq!(d.len(), descriptor.len());
    assert_eq!(d.cmdline(), Some("kernel"));
    assert_eq!(d.memory_entries().count(), 1);
}

#[test]
fn revalidation_after_descriptor_relocation_is_stable() {
    let descriptor = DescriptorBuilder::new()
        .memory_map(&[available(0x10_0000, 0x1000_0000 - 0x10_0000)])
        .module(0x20_0000, 0x20_FFFF, "kernel")
        .build();

    let mut memory = SimulatedMemory::new()
        .with_bank(0x10_1000, 0x1000)
        .with_bank(0x20_0000, 0x1_0000)
        .with_bank(0xFFF_0000, 0x1_0000);
    memory.write(0x10_1000, &descriptor);
    memory.write(0x20_0000, &kernel_elf(0x10_0000, 0x8000));

    let handoff = ChainLoader::new(&mut memory, image(), ChainLoadConfig::default())
        .prepare(pa(0x10_1000))
        .unwrap();

    let elf = ElfHeader::parse(&memory.read(0x20_0000, 0x1000)).unwrap();
    let located = LocatedDescriptor::new(
        handoff.descriptor,
        descriptor_at(&memory, handoff.descriptor.as_u64()),
    );
    for _ in 0..3 {
        assert_eq!(validate(&elf, &located, image()), Ok(()));
    }
}

#[test]
fn too_many_modules_fail_before_any_change() {
    let mut builder =
        DescriptorBuilder::new().memory_map(&[available(0x10_0000, 0x1000_0000 - 0x10_0000)]);
    for i in 0..33u32 {
        let base = 0x20_0000 + i * 0x1_0000;
        builder = builder.module(base, base + 0xFFFF, &format!("m{i}"));
    }
    let descriptor = builder.build();

    let mut memory = SimulatedMemory::new().with_bank(0x9000, 0x2000);
    memory.write(0x9000, &descriptor);

    let mut recorder = RecordingLoader::default();
    let err = ChainLoader::new(&mut memory, image(), ChainLoadConfig::default())
        .boot(pa(0x9000), &mut recorder);

    assert_eq!(err, ChainLoadError::CapacityExceeded { capacity: 32 });
    assert!(recorder.calls.is_empty());
    assert_eq!(memory.read(0x9000, descriptor.len()), descriptor);
}

#[test]
fn kernel_segment_in_reserved_memory_is_out_of_ram() {
    let descriptor = DescriptorBuilder::new()
        .memory_map(&[
            available(0x10_0000, 0x1000_0000 - 0x10_0000),
            MemoryMapEntry::new(0x1000_0000, 0x10_0000, MemoryKind::Reserved),
        ])
        .module(0x20_0000, 0x20_FFFF, "kernel")
        .build();

    let mut memory = SimulatedMemory::new()
        .with_bank(0x9000, 0x1000)
        .with_bank(0x20_0000, 0x1_0000);
    memory.write(0x9000, &descriptor);
    memory.write(0x20_0000, &kernel_elf(0x1000_8000, 0x1000));

    let mut loader = ChainLoader::new(&mut memory, image(), ChainLoadConfig::default());
    let err = loader.prepare(pa(0x9000)).unwrap_err();

    assert_eq!(
        err,
        ChainLoadError::OutOfRam {
            segment: PhysicalRange::new(pa(0x1000_8000), 0x1000)
        }
    );
    assert_eq!(loader.descriptor_relocations(), 0);
    assert_eq!(loader.module_relocations(), 0);
    assert_eq!(memory.read(0x9000, descriptor.len()), descriptor);
}

#[test]
fn conflicting_module_is_moved_with_its_contents() {
    let descriptor = DescriptorBuilder::new()
        .cmdline("phys_max=2G")
        .memory_map(&[available(0x10_0000, 0x1000_0000 - 0x10_0000)])
        .module(0x20_0000, 0x20_FFFF, "kernel verbose")
        .module(0x100_0000, 0x100_0FFF, "initrd")
        .build();
    let initrd = pattern(0x1000, 7);

    let mut memory = SimulatedMemory::new()
        .with_bank(0x9000, 0x1000)
        .with_bank(0x20_0000, 0x1_0000)
        .with_bank(0x100_0000, 0x1000)
        .with_bank(0xFFF_0000, 0x1_0000);
    memory.write(0x9000, &descriptor);
    memory.write(0x20_0000, &kernel_elf(0x100_0000, 0x8000));
    memory.write(0x100_0000, &initrd);

    let mut loader = ChainLoader::new(&mut memory, image(), ChainLoadConfig::default());
    let handoff = loader.prepare(pa(0x9000)).unwrap();

    assert_eq!(loader.module_relocations(), 1);
    assert_eq!(loader.descriptor_relocations(), 0);
    let moved = *loader.modules().iter().nth(1).unwrap();
    assert_eq!(moved.start, 0xFFF_F000);
    assert_eq!(moved.end, 0xFFF_FFFF);
    assert_eq!(moved.size(), 0x1000);
    assert_eq!(loader.ceiling(), pa(0xFFF_F000));
    assert_eq!(handoff.jump_code, pa(0xFFF_E000));

    assert_eq!(memory.read(0xFFF_F000, 0x1000), initrd);

    let d = descriptor_at(&memory, 0x9000);
    let (_, tag) = d.modules().next().unwrap();
    assert_eq!(tag.label, "initrd");
    assert_eq!((tag.start, tag.end), (0xFFF_F000, 0xFFF_FFFF));
    assert_eq!(d.cmdline(), Some("kernel verbose"));

    let segment = PhysicalRange::new(pa(0x100_0000), 0x8000);
    assert!(!tag.range().intersects(segment));
    assert!(!tag.range().intersects(image()));
}

#[test]
fn descriptor_relocation_is_bounded() {
    let descriptor = DescriptorBuilder::new()
        .memory_map(&[available(0x10_0000, 0x10_0000)])
        .module(0x30_0000, 0x30_0FFF, "kernel")
        .build();

    let mut memory = SimulatedMemory::new()
        .with_bank(0x10_0000, 0x10_0000)
        .with_bank(0x30_0000, 0x1000);
    memory.write(0x15_0000, &descriptor);
    // the kernel wants the whole of RAM, so wherever the descriptor goes it is in the way
    memory.write(0x30_0000, &kernel_elf(0x10_0000, 0x10_0000));

    let mut recorder = RecordingLoader::default();
    let mut loader = ChainLoader::new(&mut memory, image(), ChainLoadConfig::default());
    let err = loader.boot(pa(0x15_0000), &mut recorder);

    assert_eq!(
        err,
        ChainLoadError::RelocationLimit {
            purpose: RegionPurpose::Descriptor,
            limit: MAX_DESCRIPTOR_RELOCATIONS
        }
    );
    assert_eq!(loader.descriptor_relocations(), MAX_DESCRIPTOR_RELOCATIONS);
    assert_eq!(loader.descriptor(), pa(0x1F_C000));
    assert!(recorder.calls.is_empty());
    assert_eq!(memory.read(0x1F_C000, descriptor.len()), descriptor);
}

#[test]
fn module_relocation_is_bounded() {
    let descriptor = DescriptorBuilder::new()
        .memory_map(&[available(0x10_0000, 0x10_0000)])
        .module(0x30_0000, 0x30_0FFF, "kernel")
        .module(0x18_0000, 0x18_00FF, "payload")
        .build();
    let payload = pattern(0x100, 42);

    let mut memory = SimulatedMemory::new()
        .with_bank(0x9000, 0x1000)
        .with_bank(0x10_0000, 0x10_0000)
        .with_bank(0x30_0000, 0x1000);
    memory.write(0x9000, &descriptor);
    memory.write(0x30_0000, &kernel_elf(0x10_0000, 0x10_0000));
    memory.write(0x18_0000, &payload);

    let mut loader = ChainLoader::new(&mut memory, image(), ChainLoadConfig::default());
    let err = loader.prepare(pa(0x9000)).unwrap_err();

    assert_eq!(
        err,
        ChainLoadError::RelocationLimit {
            purpose: RegionPurpose::Module,
            limit: MAX_MODULE_RELOCATIONS
        }
    );
    assert_eq!(loader.module_relocations(), MAX_MODULE_RELOCATIONS);

    let last = *loader.modules().iter().nth(1).unwrap();
    assert_eq!(u64::from(last.start), 0x18_0000 - u64::from(MAX_MODULE_RELOCATIONS) * 0x1000);
    assert_eq!(memory.read(u64::from(last.start), 0x100), payload);
}

#[test]
fn no_room_for_the_descriptor() {
    let descriptor = DescriptorBuilder::new()
        .memory_map(&[available(0x10_0000, 0x1000)])
        .module(0x30_0000, 0x30_0FFF, "kernel")
        .build();

    let mut memory = SimulatedMemory::new()
        .with_bank(0x10_0000, 0x1000)
        .with_bank(0x30_0000, 0x1000);
    memory.write(0x10_0000, &descriptor);
    memory.write(0x30_0000, &kernel_elf(0x10_0000, 0x1000));

    let err = ChainLoader::new(&mut memory, image(), ChainLoadConfig::default())
        .prepare(pa(0x10_0000))
        .unwrap_err();
    assert_eq!(
        err,
        ChainLoadError::NoRegionFound {
            purpose: RegionPurpose::Descriptor,
            size: descriptor.len() as u64
        }
    );
}

#[test]
fn descriptor_without_modules() {
    let descriptor = DescriptorBuilder::new()
        .cmdline("x")
        .memory_map(&[available(0x10_0000, 0x10_0000)])
        .build();

    let mut memory = SimulatedMemory::new().with_bank(0x9000, 0x1000);
    memory.write(0x9000, &descriptor);

    let err = ChainLoader::new(&mut memory, image(), ChainLoadConfig::default())
        .prepare(pa(0x9000))
        .unwrap_err();
    assert_eq!(err, ChainLoadError::NoModule);
}

#[test]
fn kernel_that_is_not_an_elf_image() {
    let descriptor = DescriptorBuilder::new()
        .memory_map(&[available(0x10_0000, 0x10_0000)])
        .module(0x20_0000, 0x20_0FFF, "kernel")
        .build();

    let mut memory = SimulatedMemory::new()
        .with_bank(0x9000, 0x1000)
        .with_bank(0x20_0000, 0x1000);
    memory.write(0x9000, &descriptor);
    memory.write(0x20_0000, b"MZ not an elf");

    let err = ChainLoader::new(&mut memory, image(), ChainLoadConfig::default())
        .prepare(pa(0x9000))
        .unwrap_err();
    assert_eq!(err, ChainLoadError::Elf(trampoline_elf::ElfError::BadMagic));
}

#[test]
fn unbacked_descriptor_is_a_memory_error() {
    let mut memory = SimulatedMemory::new();
    let err = ChainLoader::new(&mut memory, image(), ChainLoadConfig::default())
        .prepare(pa(0x9000))
        .unwrap_err();
    assert!(matches!(err, ChainLoadError::Memory(_)));
}

#[test]
fn kernel_handle_is_the_first_module() {
    let descriptor = DescriptorBuilder::new()
        .memory_map(&[available(0x10_0000, 0x1000_0000 - 0x10_0000)])
        .module(0x20_0000, 0x20_FFFF, "kernel")
        .module(0x30_0000, 0x30_0FFF, "second")
        .build();

    let mut memory = SimulatedMemory::new()
        .with_bank(0x9000, 0x1000)
        .with_bank(0x20_0000, 0x1_0000);
    memory.write(0x9000, &descriptor);
    memory.write(0x20_0000, &kernel_elf(0x100_0000, 0x8000));

    let mut loader = ChainLoader::new(&mut memory, image(), ChainLoadConfig::default());
    loader.prepare(pa(0x9000)).unwrap();

    let kernel = loader.modules().get(ModuleHandle::KERNEL).unwrap();
    assert_eq!(kernel.start, 0x20_0000);
    assert_eq!(kernel.state, ModuleState::Consumed);
    let second = loader.modules().iter().nth(1).unwrap();
    assert_eq!(second.state, ModuleState::Pending);

    let d = descriptor_at(&memory, 0x9000);
    assert_eq!(d.modules().map(|(_, m)| m.label).collect::<Vec<_>>(), ["second"]);
}
