// mostly inspired by:
// - https://github.com/zeux/niagara/tree/master/src
// - https://github.com/MaikKlein/ash/blob/master/examples/src/lib.rs#L256
mod command_buffers;
mod create_framebuffer;
mod create_image_view;
mod create_sampler;
mod create_viewport;
mod debug;
mod device;
mod load_shader;
mod pipeline;
mod render_pass;
mod swapchain;
mod synchronization;
mod uniforms;

pub use self::command_buffers::*;
pub use self::create_framebuffer::*;
pub use self::create_image_view::*;
pub use self::create_sampler::*;
pub use self::create_viewport::*;
pub use self::debug::*;
pub use self::device::*;
pub use self::load_shader::*;
pub use self::pipeline::*;
pub use self::render_pass::*;
pub use self::swapchain::*;
pub use self::synchronization::*;
pub use self::uniforms::*;
