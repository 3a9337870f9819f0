//! Kernel heap setup.
//!
//! Maps a fixed-size heap region to physical frames taken from the
//! bootloader's memory map and registers a linked_list_allocator as the
//! global allocator. The heap backs instance names and shell strings;
//! all scheduling structures are statically sized.

use bootloader_api::info::{MemoryRegion, MemoryRegionKind};
use bootloader_api::BootInfo;
use linked_list_allocator::LockedHeap;
use x86_64::registers::control::Cr3;
use x86_64::structures::paging::{
    FrameAllocator, Mapper, OffsetPageTable, Page, PageTable, PageTableFlags, PhysFrame, Size4KiB,
};
use x86_64::{PhysAddr, VirtAddr};

/// Start address of the kernel heap (a high, otherwise unused region).
pub const HEAP_START: usize = 0x_4444_4444_0000;

/// Heap size in bytes (64 KiB — the shell and instance names need very
/// little).
pub const HEAP_SIZE: usize = 64 * 1024;

/// The global heap allocator. In host test builds the std allocator is
/// used instead.
#[cfg_attr(not(test), global_allocator)]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

/// Map the heap and initialize the allocator.
///
/// Must run before anything allocates. Boot fails hard here on a
/// malformed memory map; there is nothing to degrade to without a heap.
pub fn init(boot_info: &'static BootInfo) {
    let phys_mem_offset = boot_info
        .physical_memory_offset
        .into_option()
        .expect("bootloader must map physical memory");
    let phys_mem_offset = VirtAddr::new(phys_mem_offset);

    let level_4_table = unsafe { active_level_4_table(phys_mem_offset) };
    let mut mapper = unsafe { OffsetPageTable::new(level_4_table, phys_mem_offset) };
    let mut frames = BumpFrameAllocator::new(&boot_info.memory_regions);

    let heap_start = VirtAddr::new(HEAP_START as u64);
    let heap_end = heap_start + HEAP_SIZE as u64 - 1u64;
    let pages = Page::range_inclusive(
        Page::containing_address(heap_start),
        Page::containing_address(heap_end),
    );

    for page in pages {
        let frame = frames.allocate_frame().expect("out of physical frames");
        let flags = PageTableFlags::PRESENT | PageTableFlags::WRITABLE;
        unsafe {
            mapper
                .map_to(page, frame, flags, &mut frames)
                .expect("heap page mapping failed")
                .flush();
        }
    }

    unsafe {
        ALLOCATOR.lock().init(HEAP_START as *mut u8, HEAP_SIZE);
    }
}

/// Get a mutable reference to the active level 4 page table.
///
/// # Safety
/// `physical_memory_offset` must be the offset the bootloader used to
/// map all physical memory, and this must only be called once.
unsafe fn active_level_4_table(physical_memory_offset: VirtAddr) -> &'static mut PageTable {
    let (level_4_table_frame, _) = Cr3::read();
    let phys = level_4_table_frame.start_address();
    let virt = physical_memory_offset + phys.as_u64();
    let page_table_ptr: *mut PageTable = virt.as_mut_ptr();

    unsafe { &mut *page_table_ptr }
}

/// Bump allocator over the bootloader's usable regions; frames are
/// never freed, which is enough to map one fixed heap.
struct BumpFrameAllocator {
    regions: &'static [MemoryRegion],
    next: usize,
}

impl BumpFrameAllocator {
    fn new(regions: &'static [MemoryRegion]) -> Self {
        BumpFrameAllocator { regions, next: 0 }
    }

    fn usable_frames(&self) -> impl Iterator<Item = PhysFrame> + '_ {
        self.regions
            .iter()
            .filter(|r| r.kind == MemoryRegionKind::Usable)
            .flat_map(|r| (r.start..r.end).step_by(4096))
            .map(|addr| PhysFrame::containing_address(PhysAddr::new(addr)))
    }
}

unsafe impl FrameAllocator<Size4KiB> for BumpFrameAllocator {
    fn allocate_frame(&mut self) -> Option<PhysFrame<Size4KiB>> {
        let frame = self.usable_frames().nth(self.next);
        self.next += 1;
        frame
    }
}
