use leptos::callback::{Callable, Callback};
use leptos::ev::SubmitEvent;
use leptos::logging::{error, log};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_meta::{provide_meta_context, MetaTags, Stylesheet, Title};
use leptos_router::{
    components::{Route, Router, Routes},
    path,
};

use crate::admin::{AdminPanel, FormMode, PanelState, SessionGate, Submission};
use crate::client::{BrowserClient, LocalStorageTokens};
use crate::listing::{card_title, contests_for, default_year, resolve_year, years_for_class};
use crate::model::{Contest, CLASS_LEVELS, PRE_NUMBERS};

pub fn shell(options: LeptosOptions) -> impl IntoView {
    view! {
        <!DOCTYPE html>
        <html lang="en">
            <head>
                <meta charset="utf-8" />
                <meta name="viewport" content="width=device-width, initial-scale=1" />
                <AutoReload options=options.clone() />
                <HydrationScripts options />
                <MetaTags />
            </head>
            <body>
                <App />
            </body>
        </html>
    }
}

#[component]
pub fn App() -> impl IntoView {
    // Provides context that manages stylesheets, titles, meta tags, etc.
    provide_meta_context();

    view! {
        // id=leptos means cargo-leptos will hot-reload this stylesheet
        <Stylesheet id="leptos" href="/pkg/contest-hub.css" />

        <Title text="PREHSG Contest Hub" />

        <Router>
            <main>
                <Routes fallback=|| "Page not found.".into_view()>
                    <Route path=path!("/") view=Home />
                    <Route path=path!("/admin") view=AdminPage />
                </Routes>
            </main>
        </Router>
    }
}

#[component]
fn Home() -> impl IntoView {
    let contests = RwSignal::new(Vec::<Contest>::new());
    let loading = RwSignal::new(true);
    let load_error = RwSignal::new(String::new());
    let selected_class = RwSignal::new(CLASS_LEVELS[0]);
    let selected_year = RwSignal::new(None::<i32>);

    // Runs once on the client after hydration.
    Effect::new(move || {
        spawn_local(async move {
            match BrowserClient::browser().list_contests().await {
                Ok(list) => {
                    selected_year.update(|year| {
                        *year = resolve_year(&list, selected_class.get_untracked(), *year)
                    });
                    contests.set(list);
                    load_error.set(String::new());
                }
                Err(e) => {
                    error!("Failed to fetch contests: {}", e);
                    load_error.set("Failed to fetch contests".to_string());
                }
            }
            loading.set(false);
        });
    });

    let years =
        Memo::new(move |_| contests.with(|list| years_for_class(list, selected_class.get())));

    // A year from the previous class rarely exists in the new one, so start from its newest.
    let select_class = Callback::new(move |class_level: i32| {
        selected_class.set(class_level);
        selected_year.set(contests.with_untracked(|list| default_year(list, class_level)));
    });
    let select_year = Callback::new(move |year: i32| selected_year.set(Some(year)));

    view! {
        <div class="home">
            <ClassPicker selected=selected_class on_select=select_class />
            <div class="layout">
                <YearSidebar
                    years
                    contests
                    class_level=selected_class
                    selected=selected_year
                    on_select=select_year
                />
                <section class="content">
                    {move || {
                        if loading.get() {
                            return view! { <p class="placeholder">"Loading contests..."</p> }
                                .into_any();
                        }
                        if !load_error.get().is_empty() {
                            return view! { <p class="error">{load_error.get()}</p> }.into_any();
                        }
                        let Some(year) = selected_year.get() else {
                            return view! {
                                <p class="placeholder">
                                    "Select a year from the sidebar to view contests"
                                </p>
                            }
                                .into_any();
                        };
                        let visible = contests
                            .with(|list| contests_for(list, selected_class.get(), year));
                        if visible.is_empty() {
                            return view! {
                                <p class="placeholder">"No contests available for this year."</p>
                            }
                                .into_any();
                        }
                        let count = visible.len();
                        view! {
                            <h2>{format!("Class {} - Year {}", selected_class.get(), year)}</h2>
                            <p class="count">
                                {format!("{} contest{} found", count, if count == 1 { "" } else { "s" })}
                            </p>
                            <div class="card-grid">
                                {visible
                                    .into_iter()
                                    .map(|contest| view! { <ContestCard contest /> })
                                    .collect_view()}
                            </div>
                        }
                            .into_any()
                    }}
                </section>
            </div>
        </div>
    }
}

#[component]
fn ClassPicker(selected: RwSignal<i32>, on_select: Callback<i32>) -> impl IntoView {
    view! {
        <header class="site-header">
            <h1>"PREHSG Contest Hub"</h1>
            <nav class="class-picker">
                {CLASS_LEVELS
                    .iter()
                    .map(|&class_level| {
                        view! {
                            <button
                                class="class-button"
                                class:selected=move || selected.get() == class_level
                                on:click=move |_| on_select.run(class_level)
                            >
                                {format!("Class {}", class_level)}
                            </button>
                        }
                    })
                    .collect_view()}
                <a class="admin-link" href="/admin">
                    "Admin"
                </a>
            </nav>
        </header>
    }
}

#[component]
fn YearSidebar(
    years: Memo<Vec<i32>>,
    contests: RwSignal<Vec<Contest>>,
    class_level: RwSignal<i32>,
    selected: RwSignal<Option<i32>>,
    on_select: Callback<i32>,
) -> impl IntoView {
    view! {
        <aside class="sidebar">
            <h2>"Years"</h2>
            {move || {
                let years = years.get();
                if years.is_empty() {
                    return view! { <p class="placeholder">"No years available"</p> }.into_any();
                }
                years
                    .into_iter()
                    .map(|year| {
                        let count = contests
                            .with(|list| contests_for(list, class_level.get(), year).len());
                        view! {
                            <button
                                class="year-button"
                                class:selected=move || selected.get() == Some(year)
                                on:click=move |_| on_select.run(year)
                            >
                                {year}
                                <span class="year-count">{count}</span>
                            </button>
                        }
                    })
                    .collect_view()
                    .into_any()
            }}
        </aside>
    }
}

#[component]
fn ContestCard(contest: Contest) -> impl IntoView {
    let title = card_title(&contest);
    let pre_number = format!("Pre #{}", contest.pre_number);

    view! {
        <div class="contest-card">
            <h3>{title}</h3>
            <p class="pre-number">{pre_number}</p>
            <div class="card-links">
                <ExternalLink url=contest.contest_url label="Contest" variant="btn-primary" />
                <ExternalLink url=contest.solution_url label="Solution" variant="btn-outline" />
            </div>
        </div>
    }
}

/// Opens in a new tab. A missing URL renders as a greyed-out label.
#[component]
fn ExternalLink(url: Option<String>, label: &'static str, variant: &'static str) -> impl IntoView {
    match url {
        Some(url) => {
            view! {
                <a class=variant href=url target="_blank" rel="noopener noreferrer">
                    {label}
                </a>
            }
                .into_any()
        }
        None => view! { <span class=format!("{} disabled", variant)>{label}</span> }.into_any(),
    }
}

#[component]
fn AdminPage() -> impl IntoView {
    // The token only exists in the browser, so the server always renders the login form and the
    // client switches after hydration.
    let gate = RwSignal::new(SessionGate::Anonymous);
    Effect::new(move || gate.set(SessionGate::from_store(&LocalStorageTokens)));

    view! {
        <div class="admin-page">
            <header class="admin-header">
                <a class="btn-outline" href="/">
                    "Back to Home"
                </a>
                <h1>"Admin Panel"</h1>
            </header>
            {move || match gate.get() {
                SessionGate::Anonymous => view! { <AdminLogin gate /> }.into_any(),
                SessionGate::Authenticated => view! { <ContestManager gate /> }.into_any(),
            }}
        </div>
    }
}

#[component]
fn AdminLogin(gate: RwSignal<SessionGate>) -> impl IntoView {
    let password = RwSignal::new(String::new());
    let error = RwSignal::new(String::new());
    let pending = RwSignal::new(false);

    let submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        let p = password.get();
        if p.is_empty() {
            error.set("Please enter password.".to_string());
            return;
        }
        pending.set(true);
        spawn_local(async move {
            match BrowserClient::browser().login(&p).await {
                Ok(_) => {
                    error.set(String::new());
                    password.set(String::new());
                    gate.set(SessionGate::Authenticated);
                }
                Err(e) => error.set(e.user_message("Login failed")),
            }
            pending.set(false);
        });
    };

    view! {
        <section class="admin-section">
            <h2>"Admin Login"</h2>
            <form class="admin-form" on:submit=submit>
                <label>
                    "Password: "
                    <input
                        class="form-input"
                        type="password"
                        prop:value=move || password.get()
                        on:input=move |ev| password.set(event_target_value(&ev))
                    />
                </label>
                <button type="submit" class="btn-primary" disabled=move || pending.get()>
                    {move || if pending.get() { "Logging in..." } else { "Login" }}
                </button>
            </form>
            {move || (!error.get().is_empty()).then(|| view! { <p class="error">{error.get()}</p> })}
        </section>
    }
}

#[component]
fn ContestManager(gate: RwSignal<SessionGate>) -> impl IntoView {
    let contests = RwSignal::new(Vec::<Contest>::new());
    let loading = RwSignal::new(false);
    let panel = RwSignal::new(AdminPanel::default());

    // Every mutation is followed by a full re-fetch; the table never patches itself.
    let fetch_contests = move || {
        loading.set(true);
        spawn_local(async move {
            match BrowserClient::browser().list_contests().await {
                Ok(list) => {
                    contests.set(list);
                    panel.update(|p| p.refreshed());
                }
                Err(e) => {
                    error!("Failed to fetch contests: {}", e);
                    panel.update(|p| p.fail("Failed to fetch contests"));
                }
            }
            loading.set(false);
        });
    };
    Effect::new(move || fetch_contests());

    let submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        let Some(submission) = panel.try_update(|p| p.submit()).flatten() else {
            return;
        };
        spawn_local(async move {
            let client = BrowserClient::browser();
            let result = match submission {
                Submission::Create(contest) => client.create_contest(&contest).await,
                Submission::Update(id, update) => client.update_contest(id, &update).await,
            };
            match result {
                Ok(saved) => {
                    log!("Saved contest {}", saved.id);
                    fetch_contests();
                    panel.update(|p| p.close());
                }
                Err(e) => {
                    error!("Failed to save contest: {}", e);
                    panel.update(|p| p.fail(e.user_message("Failed to save contest")));
                }
            }
        });
    };

    let delete = move |contest_id: i32| {
        let confirmed = leptos::leptos_dom::helpers::window()
            .confirm_with_message("Are you sure you want to delete this contest?")
            .unwrap_or(false);
        if !confirmed {
            return;
        }
        spawn_local(async move {
            match BrowserClient::browser().delete_contest(contest_id).await {
                Ok(()) => fetch_contests(),
                Err(e) => {
                    error!("Failed to delete contest {}: {}", contest_id, e);
                    panel.update(|p| p.fail(e.user_message("Failed to delete contest")));
                }
            }
        });
    };

    let logout = move |_| {
        spawn_local(async move {
            BrowserClient::browser().logout().await;
            gate.set(SessionGate::Anonymous);
        });
    };

    let contest_form = move || {
        let title = match panel.with(|p| p.state) {
            PanelState::FormOpen(FormMode::Edit(_)) => "Edit Contest",
            _ => "Add New Contest",
        };
        view! {
            <div class="form-overlay">
                <form class="admin-form" on:submit=submit>
                    <h2>{title}</h2>
                    {move || {
                        let message = panel.with(|p| p.error.clone());
                        (!message.is_empty()).then(|| view! { <p class="error">{message}</p> })
                    }}
                    <div class="form-group">
                        <label>
                            "Class Level *"
                            <select
                                class="form-select"
                                prop:value=move || panel.with(|p| p.form.class_level.clone())
                                on:change=move |ev| {
                                    let value = event_target_value(&ev);
                                    panel.update(|p| p.form.class_level = value);
                                }
                            >
                                <option value="">"Select class"</option>
                                {CLASS_LEVELS
                                    .iter()
                                    .map(|class_level| {
                                        view! {
                                            <option value=class_level.to_string()>
                                                {format!("Class {}", class_level)}
                                            </option>
                                        }
                                    })
                                    .collect_view()}
                            </select>
                        </label>
                    </div>
                    <div class="form-group">
                        <label>
                            "Year *"
                            <input
                                class="form-input"
                                type="number"
                                placeholder="2025"
                                prop:value=move || panel.with(|p| p.form.year.clone())
                                on:input=move |ev| {
                                    let value = event_target_value(&ev);
                                    panel.update(|p| p.form.year = value);
                                }
                            />
                        </label>
                    </div>
                    <div class="form-group">
                        <label>
                            "Pre Number *"
                            <select
                                class="form-select"
                                prop:value=move || panel.with(|p| p.form.pre_number.clone())
                                on:change=move |ev| {
                                    let value = event_target_value(&ev);
                                    panel.update(|p| p.form.pre_number = value);
                                }
                            >
                                <option value="">"Select pre"</option>
                                {PRE_NUMBERS
                                    .map(|pre_number| {
                                        view! {
                                            <option value=pre_number.to_string()>
                                                {format!("Pre #{}", pre_number)}
                                            </option>
                                        }
                                    })
                                    .collect_view()}
                            </select>
                        </label>
                    </div>
                    <div class="form-group">
                        <label>
                            "Contest URL"
                            <input
                                class="form-input"
                                type="url"
                                placeholder="https://..."
                                prop:value=move || panel.with(|p| p.form.contest_url.clone())
                                on:input=move |ev| {
                                    let value = event_target_value(&ev);
                                    panel.update(|p| p.form.contest_url = value);
                                }
                            />
                        </label>
                    </div>
                    <div class="form-group">
                        <label>
                            "Solution URL"
                            <input
                                class="form-input"
                                type="url"
                                placeholder="https://..."
                                prop:value=move || panel.with(|p| p.form.solution_url.clone())
                                on:input=move |ev| {
                                    let value = event_target_value(&ev);
                                    panel.update(|p| p.form.solution_url = value);
                                }
                            />
                        </label>
                    </div>
                    <div class="form-actions">
                        <button
                            type="button"
                            class="btn-outline"
                            on:click=move |_| panel.update(|p| p.close())
                        >
                            "Cancel"
                        </button>
                        <button
                            type="submit"
                            class="btn-primary"
                            disabled=move || panel.with(|p| p.saving)
                        >
                            {move || {
                                panel
                                    .with(|p| {
                                        if p.saving {
                                            "Saving..."
                                        } else if p.editing_id().is_some() {
                                            "Update"
                                        } else {
                                            "Add"
                                        }
                                    })
                            }}
                        </button>
                    </div>
                </form>
            </div>
        }
    };

    view! {
        <section class="admin-section">
            <div class="admin-toolbar">
                <button class="btn-primary" on:click=move |_| panel.update(|p| p.open_create())>
                    "Add Contest"
                </button>
                <button class="btn-logout" on:click=logout>
                    "Logout"
                </button>
            </div>

            // Errors from fetch/delete show here; save errors show inside the form.
            {move || {
                let message = panel.with(|p| if p.is_form_open() { String::new() } else { p.error.clone() });
                (!message.is_empty()).then(|| view! { <p class="error">{message}</p> })
            }}

            {move || panel.with(|p| p.is_form_open()).then(contest_form)}

            <div class="table-responsive">
                <table class="admin-table">
                    <thead>
                        <tr>
                            <th>"Class"</th>
                            <th>"Year"</th>
                            <th>"Pre #"</th>
                            <th>"Contest URL"</th>
                            <th>"Solution URL"</th>
                            <th>"Actions"</th>
                        </tr>
                    </thead>
                    <tbody>
                        {move || {
                            contests
                                .with(|list| {
                                    list.iter()
                                        .map(|contest| {
                                            let id = contest.id;
                                            let for_edit = contest.clone();
                                            view! {
                                                <tr>
                                                    <td>{format!("Class {}", contest.class_level)}</td>
                                                    <td>{contest.year}</td>
                                                    <td>{format!("Pre #{}", contest.pre_number)}</td>
                                                    <td>
                                                        <ExternalLink
                                                            url=contest.contest_url.clone()
                                                            label="View"
                                                            variant="table-link"
                                                        />
                                                    </td>
                                                    <td>
                                                        <ExternalLink
                                                            url=contest.solution_url.clone()
                                                            label="View"
                                                            variant="table-link"
                                                        />
                                                    </td>
                                                    <td class="actions">
                                                        <button
                                                            class="btn-secondary"
                                                            on:click=move |_| panel.update(|p| p.open_edit(&for_edit))
                                                        >
                                                            "Edit"
                                                        </button>
                                                        <button class="btn-danger" on:click=move |_| delete(id)>
                                                            "Delete"
                                                        </button>
                                                    </td>
                                                </tr>
                                            }
                                        })
                                        .collect_view()
                                })
                        }}
                    </tbody>
                </table>
            </div>
            {move || {
                (contests.with(|list| list.is_empty()) && !loading.get())
                    .then(|| {
                        view! {
                            <p class="placeholder">"No contests yet. Add one to get started!"</p>
                        }
                    })
            }}
        </section>
    }
}
