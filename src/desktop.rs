use crate::init_tracing;
use crate::manager::LeadManager;
use crate::models::{
    ActionResponse, BooleanResponse, LeadField, LeadFields, LeadListSnapshot, Notice, PrinterListing,
};
use std::sync::Arc;
use tauri::{Emitter, Manager, RunEvent};

#[derive(Clone)]
struct AppState {
    manager: Arc<LeadManager>,
}

#[tauri::command]
async fn form_get(state: tauri::State<'_, AppState>) -> Result<LeadFields, String> {
    Ok(state.manager.form_get().await)
}

#[tauri::command]
async fn form_update(
    state: tauri::State<'_, AppState>,
    field: LeadField,
    value: String,
) -> Result<LeadFields, String> {
    Ok(state.manager.form_update(field, value).await)
}

#[tauri::command]
async fn form_submit(state: tauri::State<'_, AppState>) -> Result<ActionResponse<LeadFields>, String> {
    Ok(state.manager.form_submit().await)
}

#[tauri::command]
async fn list_get(state: tauri::State<'_, AppState>) -> Result<LeadListSnapshot, String> {
    Ok(state.manager.list_get().await)
}

#[tauri::command]
async fn list_reload(state: tauri::State<'_, AppState>) -> Result<LeadListSnapshot, String> {
    Ok(state.manager.list_reload().await)
}

#[tauri::command]
async fn list_start_edit(state: tauri::State<'_, AppState>, lead_id: i64) -> Result<LeadListSnapshot, String> {
    state.manager.list_start_edit(lead_id).await.map_err(to_client_error)
}

#[tauri::command]
async fn list_update_edit(
    state: tauri::State<'_, AppState>,
    field: LeadField,
    value: String,
) -> Result<LeadListSnapshot, String> {
    state
        .manager
        .list_update_edit(field, value)
        .await
        .map_err(to_client_error)
}

#[tauri::command]
async fn list_cancel_edit(state: tauri::State<'_, AppState>) -> Result<LeadListSnapshot, String> {
    Ok(state.manager.list_cancel_edit().await)
}

#[tauri::command]
async fn list_save_edit(
    state: tauri::State<'_, AppState>,
) -> Result<ActionResponse<LeadListSnapshot>, String> {
    state.manager.list_save_edit().await.map_err(to_client_error)
}

#[tauri::command]
async fn list_delete(
    state: tauri::State<'_, AppState>,
    lead_id: i64,
) -> Result<ActionResponse<LeadListSnapshot>, String> {
    Ok(state.manager.list_delete(lead_id).await)
}

#[tauri::command]
async fn export_pdf(state: tauri::State<'_, AppState>) -> Result<Notice, String> {
    Ok(state.manager.export_pdf().await)
}

#[tauri::command]
async fn printers_get(state: tauri::State<'_, AppState>) -> Result<PrinterListing, String> {
    Ok(state.manager.printers_get().await)
}

#[tauri::command]
async fn printers_refresh(
    state: tauri::State<'_, AppState>,
) -> Result<ActionResponse<PrinterListing>, String> {
    Ok(state.manager.printers_refresh().await)
}

#[tauri::command]
async fn printer_select(state: tauri::State<'_, AppState>, printer_id: String) -> Result<PrinterListing, String> {
    state
        .manager
        .printer_select(&printer_id)
        .await
        .map_err(to_client_error)
}

#[tauri::command]
async fn print_leads(state: tauri::State<'_, AppState>, printer_id: Option<String>) -> Result<Notice, String> {
    Ok(state.manager.print_leads(printer_id).await)
}

#[tauri::command]
async fn save_print_api_key(state: tauri::State<'_, AppState>, api_key: String) -> Result<BooleanResponse, String> {
    state
        .manager
        .save_print_api_key(api_key)
        .await
        .map_err(to_client_error)?;
    Ok(BooleanResponse { success: true })
}

#[tauri::command]
async fn clear_print_api_key(state: tauri::State<'_, AppState>) -> Result<BooleanResponse, String> {
    state.manager.clear_print_api_key().await.map_err(to_client_error)?;
    Ok(BooleanResponse { success: true })
}

#[tauri::command]
async fn has_print_api_key(state: tauri::State<'_, AppState>) -> Result<BooleanResponse, String> {
    Ok(BooleanResponse {
        success: state.manager.has_print_api_key().await,
    })
}

pub fn run() {
    let app = tauri::Builder::default()
        .setup(|app| {
            let app_data_dir = app.path().app_data_dir().map_err(|error| error.to_string())?;
            std::fs::create_dir_all(&app_data_dir).map_err(|error| error.to_string())?;
            init_tracing(&app_data_dir).map_err(|error| error.to_string())?;

            let downloads = app.path().download_dir().ok();
            let manager = LeadManager::new(&app_data_dir, downloads).map_err(|error| error.to_string())?;
            let handle = app.handle().clone();

            tauri::async_runtime::spawn({
                let manager = manager.clone();
                async move {
                    manager.list_reload().await;
                    let _refresher = manager.spawn_list_refresher(move |event, snapshot| {
                        let payload = serde_json::json!({ "event": event, "list": snapshot });
                        if let Err(error) = handle.emit("leads_changed", payload) {
                            tracing::warn!(error = %error, "failed to forward lead change");
                        }
                    });
                }
            });

            app.manage(AppState { manager });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            form_get,
            form_update,
            form_submit,
            list_get,
            list_reload,
            list_start_edit,
            list_update_edit,
            list_cancel_edit,
            list_save_edit,
            list_delete,
            export_pdf,
            printers_get,
            printers_refresh,
            printer_select,
            print_leads,
            save_print_api_key,
            clear_print_api_key,
            has_print_api_key
        ])
        .build(tauri::generate_context!())
        .expect("failed to build tauri app");

    app.run(|app_handle, event| {
        if let RunEvent::Exit = event {
            if let Some(state) = app_handle.try_state::<AppState>() {
                state.manager.shutdown();
            }
        }
    });
}

fn to_client_error(error: impl std::fmt::Display) -> String {
    error.to_string()
}
