pub mod rtx_timer;
