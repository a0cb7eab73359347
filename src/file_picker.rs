// Cross-platform media picker helpers. On wasm we create a hidden <input type=file>
// and read the bytes; on native the functions are no-ops (native uses rfd::FileDialog
// directly, see pages::pick_media).

#[cfg(target_arch = "wasm32")]
mod web {
    use js_sys::Uint8Array;
    use once_cell::sync::Lazy;
    use std::sync::Mutex;
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::JsCast;
    use wasm_bindgen::JsValue;
    use web_sys::{FileReader, HtmlInputElement};

    /// stills for all pages; mp4 so the upload service can extract a frame
    const ACCEPT: &str = "image/png,image/jpeg,image/bmp,image/webp,video/mp4";

    static SELECTED_MEDIA: Lazy<Mutex<Option<(Vec<u8>, String)>>> = Lazy::new(|| Mutex::new(None));

    fn store_selected(bytes: Vec<u8>, name: String) {
        if let Ok(mut slot) = SELECTED_MEDIA.lock() {
            *slot = Some((bytes, name));
        }
    }

    /// Builds the hidden file input and attaches it to the document body.
    /// Off-screen rather than display:none, since some browsers refuse to
    /// forward clicks to an invisible input.
    fn build_input() -> Option<HtmlInputElement> {
        let document = web_sys::window()?.document()?;
        let input: HtmlInputElement = document.create_element("input").ok()?.dyn_into().ok()?;
        input.set_type("file");
        input.set_accept(ACCEPT);
        input
            .set_attribute(
                "style",
                "position: fixed; left: -9999px; width: 1px; height: 1px; opacity: 0;",
            )
            .ok()?;
        document.body()?.append_child(&input).ok()?;
        Some(input)
    }

    /// Reads the chosen file into memory and parks it for [`take_selected_media`].
    fn read_chosen_file(input: &HtmlInputElement) -> Option<()> {
        let file = input.files()?.get(0)?;
        let name = file.name();
        let reader = FileReader::new().ok()?;
        let reader_for_load = reader.clone();
        let onload = Closure::once(Box::new(move |_: JsValue| {
            if let Ok(result) = reader_for_load.result() {
                let arr = Uint8Array::new(&result);
                let mut bytes = vec![0u8; arr.length() as usize];
                arr.copy_to(&mut bytes[..]);
                store_selected(bytes, name);
            }
        }) as Box<dyn FnOnce(_)>);
        reader.set_onload(Some(onload.as_ref().unchecked_ref()));
        onload.forget();
        reader.read_as_array_buffer(&file).ok()
    }

    pub fn open_media_picker() {
        let Some(input) = build_input() else {
            log::error!("could not attach a file input to the document");
            return;
        };

        let onchange = Closure::wrap(Box::new(move |ev: web_sys::Event| {
            let target = ev.target().and_then(|t| t.dyn_into::<HtmlInputElement>().ok());
            if let Some(input) = target {
                if read_chosen_file(&input).is_none() {
                    log::warn!("selected file could not be read");
                }
            }
        }) as Box<dyn FnMut(_)>);
        input.set_onchange(Some(onchange.as_ref().unchecked_ref()));
        onchange.forget(); // keep alive

        input.click();
    }

    pub fn take_selected_media() -> Option<(Vec<u8>, String)> {
        SELECTED_MEDIA.lock().ok()?.take()
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::{open_media_picker, take_selected_media};

#[cfg(not(target_arch = "wasm32"))]
// Native stubs; native builds use rfd::FileDialog directly
pub fn open_media_picker() {}

#[cfg(not(target_arch = "wasm32"))]
pub fn take_selected_media() -> Option<(Vec<u8>, String)> {
    None
}
